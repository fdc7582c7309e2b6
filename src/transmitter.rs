// Calendurr: Coordinate Transmitter
//
// Streams the averaged touch position at a bounded rate while a central is
// connected, and on an explicit send closes the batch with the selected date:
//
//   STOP-<n>, DATE-<n>:<m>,<d>, END-<n>, START-<n>
//
// with a short pause between writes so the peer's receive buffer keeps up.

use std::thread;
use std::time::Duration;

use crate::calendar::Date;
use crate::config::TransmitConfig;
use crate::link::{BleLink, Marker, OutboundMessage};
use crate::storage::DateFile;
use crate::touch::filter::FilterState;

pub struct Transmitter<L> {
    link: L,
    config: TransmitConfig,
    last_coordinate_ms: Option<u32>,
    /// Never reset; wraps at `u16::MAX`.
    tag: u16,
}

impl<L: BleLink> Transmitter<L> {
    pub fn new(link: L, config: TransmitConfig) -> Self {
        Self { link, config, last_coordinate_ms: None, tag: 0 }
    }

    /// Send the current average if there is one, the link is up and the
    /// rate limit allows it.  Returns what was written.
    pub fn maybe_send(&mut self, state: &FilterState, now_ms: u32) -> Option<OutboundMessage> {
        if !self.link.is_connected() {
            return None;
        }
        let position = state.report()?;
        if let Some(last) = self.last_coordinate_ms {
            if now_ms.wrapping_sub(last) < self.config.send_interval_ms {
                return None;
            }
        }

        let msg = OutboundMessage::Coordinate(position);
        self.write(&msg);
        self.last_coordinate_ms = Some(now_ms);
        Some(msg)
    }

    /// Close the current batch with `date` and open the next one.  Writes
    /// nothing and returns `false` while disconnected.
    pub fn send_batch(&mut self, date: Date) -> bool {
        if !self.link.is_connected() {
            log::info!("send ignored, BLE not connected");
            return false;
        }

        let stop = self.marker(Marker::Stop);
        let date = OutboundMessage::Date { date, tag: Some(self.next_tag()) };
        let end = self.marker(Marker::End);
        let start = self.marker(Marker::Start);

        for (i, msg) in [stop, date, end, start].iter().enumerate() {
            if i > 0 {
                self.pause();
            }
            self.write(msg);
        }
        log::info!("batch sent: {}", date);
        true
    }

    /// Send button: close the batch with `date`, then store it as the date
    /// to restore at boot.  Nothing is written or stored while disconnected.
    pub fn send_and_save(&mut self, date: Date, date_file: &DateFile) -> bool {
        if !self.send_batch(date) {
            return false;
        }
        if let Err(e) = date_file.save(date) {
            log::warn!("saving date failed: {:#}", e);
        }
        true
    }

    /// Open a batch, e.g. right after a central connects.
    pub fn open_batch(&mut self) -> bool {
        if !self.link.is_connected() {
            return false;
        }
        let start = self.marker(Marker::Start);
        self.write(&start);
        true
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn marker(&mut self, marker: Marker) -> OutboundMessage {
        OutboundMessage::Marker { marker, tag: Some(self.next_tag()) }
    }

    fn next_tag(&mut self) -> u16 {
        self.tag = self.tag.wrapping_add(1);
        self.tag
    }

    fn write(&mut self, msg: &OutboundMessage) {
        match msg.encode() {
            Ok(payload) => self.link.write(payload.as_bytes()),
            Err(e) => log::warn!("dropping {:?}: {}", msg, e),
        }
    }

    fn pause(&self) {
        if self.config.message_gap_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.message_gap_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Position;

    #[derive(Default)]
    struct RecordingLink {
        connected: bool,
        writes: Vec<String>,
    }

    impl BleLink for RecordingLink {
        fn write(&mut self, payload: &[u8]) {
            assert!(payload.len() <= crate::link::MAX_PAYLOAD);
            self.writes.push(String::from_utf8_lossy(payload).into_owned());
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }
    }

    fn transmitter(connected: bool) -> Transmitter<RecordingLink> {
        let config = TransmitConfig { send_interval_ms: 10, message_gap_ms: 0 };
        Transmitter::new(RecordingLink { connected, writes: Vec::new() }, config)
    }

    fn tracking(p: Position) -> FilterState {
        let mut state = FilterState::new();
        state.update(p, Position::ZERO, 0.1);
        state
    }

    #[test]
    fn sends_average_as_coordinate() {
        let mut tx = transmitter(true);
        let sent = tx.maybe_send(&tracking(Position::new(80, 95)), 1000);
        assert_eq!(sent, Some(OutboundMessage::Coordinate(Position::new(80, 95))));
        assert_eq!(tx.link().writes, vec!["C:80,95"]);
    }

    #[test]
    fn never_sends_zero_average() {
        let mut tx = transmitter(true);
        assert_eq!(tx.maybe_send(&FilterState::new(), 1000), None);
        assert!(tx.link().writes.is_empty());
    }

    #[test]
    fn rate_limited_to_send_interval() {
        let mut tx = transmitter(true);
        let state = tracking(Position::new(80, 80));
        assert!(tx.maybe_send(&state, 1000).is_some());
        assert!(tx.maybe_send(&state, 1005).is_none());
        assert!(tx.maybe_send(&state, 1009).is_none());
        assert!(tx.maybe_send(&state, 1010).is_some());
        assert_eq!(tx.link().writes.len(), 2);
    }

    #[test]
    fn silent_while_disconnected() {
        let mut tx = transmitter(false);
        assert_eq!(tx.maybe_send(&tracking(Position::new(80, 80)), 1000), None);
        assert!(!tx.send_batch(Date { month: 5, day: 17 }));
        assert!(!tx.open_batch());
        assert!(tx.link().writes.is_empty());
    }

    #[test]
    fn batch_order_and_tags() {
        let mut tx = transmitter(true);
        assert!(tx.send_batch(Date { month: 5, day: 17 }));
        assert_eq!(tx.link().writes, vec!["STOP-1", "DATE-2:5,17", "END-3", "START-4"]);

        assert!(tx.send_batch(Date { month: 5, day: 18 }));
        assert_eq!(tx.link().writes[4..], ["STOP-5", "DATE-6:5,18", "END-7", "START-8"]);
    }

    #[test]
    fn tags_continue_across_batch_kinds_and_wrap() {
        let mut tx = transmitter(true);
        tx.tag = u16::MAX - 1;
        assert!(tx.open_batch());
        assert!(tx.open_batch());
        assert_eq!(tx.link().writes, vec!["START-65535", "START-0"]);
    }

    fn scratch_file(name: &str) -> DateFile {
        let dir = std::env::temp_dir().join(format!("calendurr-tx-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        DateFile::new(dir.join("date.txt"))
    }

    #[test]
    fn disconnected_send_neither_writes_nor_saves() {
        let file = scratch_file("offline");
        let mut tx = transmitter(false);

        assert!(!tx.send_and_save(Date { month: 5, day: 17 }, &file));
        assert!(tx.link().writes.is_empty());
        assert!(!file.path().exists());
    }

    #[test]
    fn disconnected_send_keeps_the_previous_date() {
        let file = scratch_file("keep");
        file.save(Date { month: 3, day: 1 }).unwrap();

        assert!(!transmitter(false).send_and_save(Date { month: 5, day: 17 }, &file));
        assert_eq!(file.load().unwrap(), Date { month: 3, day: 1 });
    }

    #[test]
    fn connected_send_writes_batch_then_saves() {
        let file = scratch_file("online");
        let mut tx = transmitter(true);

        assert!(tx.send_and_save(Date { month: 5, day: 17 }, &file));
        assert_eq!(tx.link().writes, vec!["STOP-1", "DATE-2:5,17", "END-3", "START-4"]);
        assert_eq!(file.load().unwrap(), Date { month: 5, day: 17 });
    }

    #[test]
    fn coordinates_are_untagged() {
        let mut tx = transmitter(true);
        tx.open_batch();
        tx.maybe_send(&tracking(Position::new(80, 80)), 0);
        tx.send_batch(Date::DEFAULT);
        assert_eq!(tx.link().writes, vec!["START-1", "C:80,80", "STOP-2", "DATE-3:1,1", "END-4", "START-5"]);
    }
}
