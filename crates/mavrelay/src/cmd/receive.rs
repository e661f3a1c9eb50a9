use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mavrelay_bus::{Bus, BusConfig, BusSubscription, IMAGES};
use mavrelay_transfer::{
    CompletedTransfer, HandshakeOutcome, PacketOutcome, ReceiverEvent, SessionTable,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{open_bus, shutdown_token, ReceiveArgs};
use crate::exit::{bus_error, io_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct TransferOutput {
    system_id: u8,
    component_id: u8,
    data_type: String,
    size: u32,
    packets: u8,
    quality: u8,
    width: u16,
    height: u16,
    path: String,
}

pub fn run(args: ReceiveArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    fs::create_dir_all(&args.out)
        .map_err(|err| io_error(&format!("cannot create {}", args.out.display()), err))?;

    let bus = open_bus(bus)?;
    let mut images = bus
        .subscribe(IMAGES)
        .map_err(|err| bus_error("subscribe failed", err))?;
    let cancel = shutdown_token()?;
    let table = SessionTable::new();
    let mut written = 0usize;

    info!(out = %args.out.display(), "waiting for transfers");
    while !cancel.is_cancelled() {
        let Some(message) = images
            .recv_timeout(Duration::from_millis(100))
            .map_err(|err| bus_error("receive failed", err))?
        else {
            continue;
        };
        match table.handle(&message.envelope) {
            Some(ReceiverEvent::Packet(PacketOutcome::Complete(done))) => {
                let path = output_path(&args.out, &done, written);
                fs::write(&path, &done.data)
                    .map_err(|err| io_error(&format!("cannot write {}", path.display()), err))?;
                print_report("transfer-received", &describe(&done, &path), format);
                written += 1;
                if args.count.is_some_and(|count| written >= count) {
                    break;
                }
            }
            Some(ReceiverEvent::Handshake(HandshakeOutcome::Superseded { received, packets })) => {
                info!(received, packets, "incomplete transfer replaced");
            }
            Some(event) => debug!(?event, "transfer progress"),
            None => {}
        }
    }

    Ok(SUCCESS)
}

fn output_path(dir: &Path, done: &CompletedTransfer, index: usize) -> PathBuf {
    dir.join(format!(
        "{}-{}-{index:05}.{}",
        done.key.system_id,
        done.key.component_id,
        done.descriptor.data_type.extension()
    ))
}

fn describe(done: &CompletedTransfer, path: &Path) -> TransferOutput {
    TransferOutput {
        system_id: done.key.system_id,
        component_id: done.key.component_id,
        data_type: done.descriptor.data_type.extension().to_string(),
        size: done.descriptor.size,
        packets: done.descriptor.packets,
        quality: done.descriptor.quality,
        width: done.descriptor.width,
        height: done.descriptor.height,
        path: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use mavrelay_transfer::{DataType, StreamKey, TransferDescriptor};

    use super::*;

    #[test]
    fn names_files_by_sender_and_type() {
        let done = CompletedTransfer {
            key: StreamKey {
                system_id: 42,
                component_id: 30,
            },
            descriptor: TransferDescriptor::plan(DataType::Jpeg, 10, 60, 640, 480).unwrap(),
            data: Bytes::from_static(b"0123456789"),
        };
        let path = output_path(Path::new("/tmp/out"), &done, 3);
        assert_eq!(path, PathBuf::from("/tmp/out/42-30-00003.jpg"));
        assert_eq!(describe(&done, &path).size, 10);
    }
}
