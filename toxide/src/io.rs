//! The I/O worker: owns file handles for live transfers, appends chat
//! logs and persists the config. Chunk reads are forwarded straight
//! to the network worker so the update loop never touches the disk.

use crate::chatlog::Logger;
use crate::msg::{IOAction, IOEvent, Msg, ToxAction};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::mpsc;
use toxide_net::{FileId, FriendNumber};

type FileKey = (FriendNumber, FileId);

pub fn spawn_io_worker(
    tx_msg: mpsc::Sender<Msg>,
    tx_tox: mpsc::Sender<ToxAction>,
    rx_io: mpsc::Receiver<IOAction>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut files: HashMap<FileKey, File> = HashMap::new();
        let mut logger = Logger::new();

        while let Ok(action) = rx_io.recv() {
            match action {
                IOAction::FileOpenRead(friend, file_id, path) => {
                    match File::open(&path) {
                        Ok(f) => {
                            files.insert((friend, file_id), f);
                        }
                        Err(e) => {
                            let _ = tx_msg.send(Msg::IO(IOEvent::FileError(
                                friend,
                                file_id,
                                format!("could not open {}: {}", path.display(), e),
                            )));
                        }
                    }
                }
                IOAction::FileOpenWrite(friend, file_id, path) => {
                    if let Some(parent) = path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    match OpenOptions::new().create(true).append(true).open(&path) {
                        Ok(f) => {
                            files.insert((friend, file_id), f);
                        }
                        Err(e) => {
                            let _ = tx_msg.send(Msg::IO(IOEvent::FileError(
                                friend,
                                file_id,
                                format!("could not create {}: {}", path.display(), e),
                            )));
                        }
                    }
                }
                IOAction::ReadChunk(friend, file, file_id, position, length) => {
                    let Some(f) = files.get_mut(&(friend, file_id)) else {
                        let _ = tx_msg.send(Msg::IO(IOEvent::FileError(
                            friend,
                            file_id,
                            "no open handle for transfer".to_owned(),
                        )));
                        continue;
                    };
                    let mut buf = vec![0u8; length];
                    let result = f
                        .seek(SeekFrom::Start(position))
                        .and_then(|_| f.read(&mut buf));
                    match result {
                        Ok(n) => {
                            buf.truncate(n);
                            let _ = tx_tox.send(ToxAction::FileSendChunk(
                                friend, file, position, buf,
                            ));
                            let _ = tx_msg.send(Msg::IO(IOEvent::ChunkRead(
                                friend, file_id, position, n,
                            )));
                        }
                        Err(e) => {
                            let _ = tx_msg.send(Msg::IO(IOEvent::FileError(
                                friend,
                                file_id,
                                format!("read failed: {}", e),
                            )));
                        }
                    }
                }
                IOAction::WriteChunk(friend, file_id, position, data) => {
                    let Some(f) = files.get_mut(&(friend, file_id)) else {
                        continue;
                    };
                    let len = data.len();
                    let result = f
                        .seek(SeekFrom::Start(position))
                        .and_then(|_| f.write_all(&data));
                    match result {
                        Ok(()) => {
                            let _ = tx_msg.send(Msg::IO(IOEvent::ChunkWritten(
                                friend, file_id, position, len,
                            )));
                        }
                        Err(e) => {
                            let _ = tx_msg.send(Msg::IO(IOEvent::FileError(
                                friend,
                                file_id,
                                format!("write failed: {}", e),
                            )));
                        }
                    }
                }
                IOAction::CloseFile(friend, file_id) => {
                    files.remove(&(friend, file_id));
                }
                IOAction::LogLine(path, entry) => {
                    logger.append(&path, &entry);
                }
                IOAction::LogRename(from, to) => {
                    logger.rename(&from, &to);
                }
            }
        }
        logger.close_all();
    })
}
