//! JSON-lines transport for coordinator-bound messages: the cross-process
//! flavor of the worker protocol. A worker process writes one message per
//! line on its pipe; the coordinator side pumps decoded messages into the
//! same channel its in-process workers use, preserving per-sender FIFO.

use std::io::{BufRead, BufReader, Write};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{
    error::{StrataError, StrataResult},
    messages::WorkerMsg,
};

pub fn write_msg(w: &mut impl Write, msg: &WorkerMsg) -> StrataResult<()> {
    serde_json::to_writer(&mut *w, msg)
        .map_err(|e| crate::error::StrataError::validation(format!("encode message: {e}")))?;
    w.write_all(b"\n")
        .map_err(|e| crate::error::StrataError::validation(format!("write message: {e}")))?;
    Ok(())
}

pub fn read_msg(line: &str) -> StrataResult<WorkerMsg> {
    serde_json::from_str(line)
        .map_err(|e| crate::error::StrataError::validation(format!("decode message: {e}")))
}

/// One worker's leg of the process transport: an anonymous pipe with the
/// encoder on the worker side and the decoder pumping into the coordinator's
/// ingestion channel.
///
/// The returned sender is what the worker speaks; once every clone of it is
/// dropped the encoder writes EOF and both sides wind down.
pub struct WireBridge {
    encode: JoinHandle<()>,
    pump: JoinHandle<()>,
}

impl WireBridge {
    pub fn new(coord_tx: Sender<WorkerMsg>) -> StrataResult<(Sender<WorkerMsg>, WireBridge)> {
        let (reader, writer) = std::io::pipe().map_err(|e| StrataError::Other(e.into()))?;
        let (tx, rx) = unbounded::<WorkerMsg>();
        let encode = std::thread::Builder::new()
            .name("strata-wire-encode".to_string())
            .spawn(move || encode_loop(rx, writer))
            .map_err(|e| StrataError::Other(e.into()))?;
        let pump = std::thread::Builder::new()
            .name("strata-wire-pump".to_string())
            .spawn(move || {
                if let Err(err) = pump_into(BufReader::new(reader), &coord_tx) {
                    tracing::error!(%err, "wire pump stopped");
                }
            })
            .map_err(|e| StrataError::Other(e.into()))?;
        Ok((tx, WireBridge { encode, pump }))
    }

    /// Wait for EOF to propagate through the pipe. Call after the sending
    /// side is gone, or this blocks.
    pub fn join(self) {
        let _ = self.encode.join();
        let _ = self.pump.join();
    }
}

fn encode_loop(rx: Receiver<WorkerMsg>, mut writer: impl Write) {
    while let Ok(msg) = rx.recv() {
        if let Err(err) = write_msg(&mut writer, &msg) {
            tracing::error!(%err, "wire encode stopped");
            break;
        }
    }
}

/// Decode a worker process's stream into the coordinator's ingestion
/// channel. Returns the number of messages forwarded; stops at EOF or when
/// the coordinator side hangs up.
pub fn pump_into(reader: impl BufRead, tx: &Sender<WorkerMsg>) -> StrataResult<usize> {
    let mut forwarded = 0usize;
    for line in reader.lines() {
        let line =
            line.map_err(|e| crate::error::StrataError::validation(format!("read line: {e}")))?;
        if line.is_empty() {
            continue;
        }
        let msg = read_msg(&line)?;
        if tx.send(msg).is_err() {
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::Level,
        core::{Color, Rect},
        messages::{StatusNote, WorkerId},
        surface::{SurfaceId, SurfaceRecord},
    };

    fn sample_msgs() -> Vec<WorkerMsg> {
        vec![
            WorkerMsg::Created {
                worker: WorkerId(3),
                record: SurfaceRecord {
                    id: SurfaceId(17),
                    color: Color(0xFFAB_CDEF),
                    visible: false,
                    topmost: false,
                    level_expected: Level::Dock,
                    level_actual: Level::Panel,
                    rect: Rect::new(0, 0, 300, 300),
                },
            },
            WorkerMsg::Promoted {
                level: Level::Panel,
                id: SurfaceId(17),
            },
            WorkerMsg::Status {
                worker: WorkerId(3),
                note: StatusNote::CreationRejected { level: Level::Dock },
            },
        ]
    }

    #[test]
    fn messages_survive_the_wire() {
        let mut buf = Vec::new();
        for msg in sample_msgs() {
            write_msg(&mut buf, &msg).unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 3);
        let decoded: Vec<_> = text.lines().map(|l| read_msg(l).unwrap()).collect();
        assert_eq!(decoded, sample_msgs());
    }

    #[test]
    fn pump_forwards_in_order_and_skips_blank_lines() {
        let mut buf = Vec::new();
        for msg in sample_msgs() {
            write_msg(&mut buf, &msg).unwrap();
        }
        buf.extend_from_slice(b"\n");

        let (tx, rx) = crossbeam_channel::unbounded();
        let n = pump_into(std::io::Cursor::new(buf), &tx).unwrap();
        assert_eq!(n, 3);
        drop(tx);
        let forwarded: Vec<_> = rx.iter().collect();
        assert_eq!(forwarded, sample_msgs());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(read_msg("{not json").is_err());
    }

    #[test]
    fn bridge_carries_messages_through_the_pipe() {
        let (coord_tx, coord_rx) = crossbeam_channel::unbounded();
        let (tx, bridge) = WireBridge::new(coord_tx).unwrap();
        for msg in sample_msgs() {
            tx.send(msg).unwrap();
        }
        drop(tx);
        bridge.join();
        let forwarded: Vec<_> = coord_rx.try_iter().collect();
        assert_eq!(forwarded, sample_msgs());
    }
}
