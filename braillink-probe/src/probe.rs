//! The probe walk-through and connection diagnostics.

use braillink_core::{
    BrlError, Cursor, DisplayWrite, Dots, Endpoint, FilterCategory, KeySelector, Region, Session,
    Transport, commands, keysym,
};
use tracing::info;

/// Cells the exit prompt covers, display permitting.
const EXIT_PROMPT_CELLS: usize = 40;
/// Leading cells of the exit prompt that get underlined.
const UNDERLINED_CELLS: usize = 21;

/// Take a terminal slot and run the walk-through. The slot is released
/// however the walk-through ends.
pub async fn run<T: Transport>(
    session: &mut Session<T>,
    tty: Option<u32>,
) -> Result<(), BrlError> {
    session
        .with_tty(tty, |s| Box::pin(async move { walk_through(s).await }))
        .await
}

async fn walk_through<T: Transport>(s: &mut Session<T>) -> Result<(), BrlError> {
    s.ignore(FilterCategory::All, KeySelector::Any).await?;
    s.accept(
        FilterCategory::Command,
        [commands::HOME, commands::WINUP, commands::WINDN],
    )
    .await?;
    s.accept(FilterCategory::Key, keysym::TAB).await?;

    s.write_text("Press home, winup/dn or tab to continue ...").await?;
    let event = s.read_key().await?;
    info!(%event, "first key");
    s.write_text(&format!("{event} !")).await?;

    s.write(&DisplayWrite::flush().with_cursor(Cursor::At(1))).await?;
    let event = s.read_key().await?;
    info!(%event, "second key");

    let cells = s.display_size().await?.cells();
    s.write(&exit_prompt(cells)).await?;
    s.accept(FilterCategory::All, KeySelector::Any).await?;
    let event = s.read_key().await?;
    info!(%event, "last key");
    Ok(())
}

/// The underlined "press any key" region, cut to the display.
fn exit_prompt(cells: usize) -> DisplayWrite {
    let width = cells.min(EXIT_PROMPT_CELLS);
    let text: String = format!("{:<width$}", "Press any key to exit")
        .chars()
        .take(width)
        .collect();
    let mask = (0..width)
        .map(|cell| {
            if cell < UNDERLINED_CELLS {
                Dots::DOT7 | Dots::DOT8
            } else {
                Dots::empty()
            }
        })
        .collect();
    DisplayWrite::region(Region::new(1, width as u32), text).with_overlay(mask)
}

/// A human-readable explanation of a failed connection.
pub fn diagnose(err: &BrlError, endpoint: &Endpoint) -> String {
    match err {
        BrlError::ConnectionRefused { endpoint } => {
            format!("Connection to {endpoint} refused. The service is too busy...")
        }
        BrlError::AuthenticationFailed {
            endpoint,
            credential: Some(path),
        } => format!(
            "Authentication with {endpoint} failed. Please check the permissions of {}",
            path.display()
        ),
        BrlError::AuthenticationFailed { endpoint, .. } => {
            format!("Authentication with {endpoint} failed. Please configure a key file")
        }
        BrlError::TransportUnavailable { endpoint, source }
            if matches!(
                source.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ) =>
        {
            format!("Connection to {endpoint} failed. Is the service really running?")
        }
        other => format!("Connection to the service at {endpoint} failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use braillink_core::{
        CloseHandle, DisplaySize, KeyCode, Packet, PacketType, ServiceErrorCode,
        protocol::driver_name_packet,
    };
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Answers every request and plays back a fixed list of key presses.
    struct Scripted {
        keys: VecDeque<KeyCode>,
        replies: VecDeque<Packet>,
        writes: Arc<Mutex<Vec<DisplayWrite>>>,
        sent: Arc<Mutex<Vec<PacketType>>>,
        closed: bool,
    }

    impl Scripted {
        fn new(keys: Vec<KeyCode>) -> Self {
            Self {
                keys: keys.into(),
                replies: VecDeque::new(),
                writes: Arc::default(),
                sent: Arc::default(),
                closed: false,
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&mut self, packet: Packet) -> Result<(), BrlError> {
            if self.closed {
                return Err(BrlError::TransportClosed);
            }
            self.sent.lock().unwrap().push(packet.packet_type());
            let reply = match packet.packet_type() {
                PacketType::GetDisplaySize => DisplaySize {
                    columns: 40,
                    rows: 1,
                }
                .to_packet()?,
                PacketType::GetDriverName => driver_name_packet("scripted")?,
                PacketType::Write => {
                    let write = DisplayWrite::from_bytes(packet.payload())?;
                    self.writes.lock().unwrap().push(write);
                    Packet::ack()
                }
                _ => Packet::ack(),
            };
            self.replies.push_back(reply);
            Ok(())
        }

        async fn receive(&mut self) -> Result<Packet, BrlError> {
            if let Some(reply) = self.replies.pop_front() {
                return Ok(reply);
            }
            match self.keys.pop_front() {
                Some(code) => Ok(Packet::key(code.0)),
                None => Err(BrlError::TransportClosed),
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn is_open(&self) -> bool {
            !self.closed
        }

        fn close_handle(&self) -> CloseHandle {
            CloseHandle::from(tokio_util::sync::CancellationToken::new())
        }
    }

    #[tokio::test]
    async fn walk_through_shows_expanded_key() {
        let transport = Scripted::new(vec![
            keysym::RETURN,
            commands::HOME,
            keysym::TAB,
            commands::LNUP,
        ]);
        let writes = transport.writes.clone();
        let sent = transport.sent.clone();
        let mut session = Session::from_transport(transport);

        run(&mut session, Some(1)).await.unwrap();
        assert!(!session.mode().is_tty_owned());

        let writes = writes.lock().unwrap();
        let texts: Vec<Option<&str>> = writes.iter().map(|w| w.content()).collect();
        assert!(texts[0].unwrap().starts_with("Press home, winup/dn or tab"));
        assert!(texts[1].unwrap().starts_with("Key 536870941 (20000000 1d 0 0) !"));
        assert_eq!(texts[2], None);
        assert_eq!(writes[2].cursor(), Cursor::At(1));
        assert_eq!(writes[3].overlay().map(|m| m.len()), Some(40));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.first(), Some(&PacketType::EnterTtyMode));
        assert_eq!(sent.last(), Some(&PacketType::LeaveTtyMode));
    }

    #[tokio::test]
    async fn tty_is_released_when_keys_run_out() {
        let transport = Scripted::new(vec![commands::HOME]);
        let sent = transport.sent.clone();
        let mut session = Session::from_transport(transport);

        let err = run(&mut session, None).await.unwrap_err();
        assert!(matches!(err, BrlError::TransportClosed));
        // The transport is gone, so there was nothing left to release.
        assert!(session.mode().is_disconnected());
        assert_ne!(sent.lock().unwrap().last(), Some(&PacketType::LeaveTtyMode));
    }

    #[test]
    fn exit_prompt_fits_small_displays() {
        let prompt = exit_prompt(20);
        assert_eq!(prompt.target(), Some(Region::new(1, 20)));
        assert_eq!(prompt.text_cells(), Some(20));
        assert!(prompt.overlay().unwrap().iter().all(|d| !d.is_empty()));
        assert_eq!(prompt.validate(Some(DisplaySize { columns: 20, rows: 1 })), Ok(()));

        let prompt = exit_prompt(80);
        let mask = prompt.overlay().unwrap();
        assert_eq!(mask.len(), 40);
        assert_eq!(mask[20], Dots::DOT7 | Dots::DOT8);
        assert!(mask[21].is_empty());
    }

    #[test]
    fn diagnoses_match_failure() {
        let endpoint = Endpoint::default();
        let refused = BrlError::ConnectionRefused {
            endpoint: ":0".into(),
        };
        assert!(diagnose(&refused, &endpoint).contains("too busy"));

        let auth = BrlError::AuthenticationFailed {
            endpoint: ":0".into(),
            credential: Some(PathBuf::from("/etc/brlapi.key")),
        };
        assert!(diagnose(&auth, &endpoint).contains("permissions of /etc/brlapi.key"));

        let down = BrlError::TransportUnavailable {
            endpoint: ":0".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(diagnose(&down, &endpoint).contains("really running"));

        let other = BrlError::Service {
            code: ServiceErrorCode::ProtocolVersion,
            request: None,
        };
        assert!(diagnose(&other, &endpoint).starts_with("Connection to the service at :0 failed"));
    }
}
