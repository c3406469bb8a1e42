//! # Emulated Pipe Flows
//!
//! Several threads driving `IpcEmulation` through the POSIX-style surface,
//! the way legacy blocking I/O call sites use it.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{init_test_logging, WAIT};
    use cr_02_ipc_emulation::{posix, EmulationConfig, IpcEmulation, IpcError};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn emulation(reads_block: bool) -> Arc<IpcEmulation> {
        init_test_logging();
        IpcEmulation::init(EmulationConfig::default().with_reads_block(reads_block))
    }

    /// Read until end of file, the way a blocking C reader loops.
    fn read_to_eof(ipc: &IpcEmulation, descriptor: i32, chunk: usize) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buffer = vec![0u8; chunk];
        loop {
            let count = posix::read(ipc, descriptor, &mut buffer);
            assert!(count >= 0, "read failed with {count}");
            if count == 0 {
                return received;
            }
            received.extend_from_slice(&buffer[..count as usize]);
        }
    }

    #[test]
    fn test_stream_between_threads() {
        let ipc = emulation(true);
        let mut fds = [0; 2];
        assert_eq!(posix::pipe(&ipc, &mut fds), 0);
        let [writer_fd, reader_fd] = fds;

        let reader = {
            let ipc = ipc.clone();
            thread::spawn(move || read_to_eof(&ipc, reader_fd, 7))
        };

        let mut expected = Vec::new();
        for i in 0..50u8 {
            let chunk: Vec<u8> = (0..i % 13).map(|j| i.wrapping_mul(j)).collect();
            assert_eq!(posix::write(&ipc, writer_fd, &chunk), chunk.len() as isize);
            expected.extend(chunk);
        }

        // Give the reader time to drain: a closed pipe drops unread bytes.
        let drained = {
            let deadline = std::time::Instant::now() + WAIT;
            loop {
                if ipc.wait_until_can_be_read(reader_fd, Some(Duration::ZERO))
                    == Err(IpcError::TimedOut)
                {
                    break true;
                }
                if std::time::Instant::now() > deadline {
                    break false;
                }
                thread::sleep(Duration::from_millis(1));
            }
        };
        assert!(drained);
        assert_eq!(posix::close(&ipc, writer_fd), 0);

        assert_eq!(reader.join().unwrap(), expected);
        assert_eq!(posix::close(&ipc, reader_fd), 0);
        assert_eq!(ipc.open_descriptor_count(), 0);
    }

    #[test]
    fn test_request_reply_over_two_directions() {
        let ipc = emulation(true);
        let (client, server) = ipc.create_default_pair().unwrap();

        let server_thread = {
            let ipc = ipc.clone();
            thread::spawn(move || {
                let mut served = 0;
                loop {
                    match ipc.read(server, 64) {
                        Ok(request) => {
                            let mut reply = request.clone();
                            reply.reverse();
                            ipc.write(server, &reply).unwrap();
                            served += 1;
                        }
                        Err(IpcError::Closed) => return served,
                        Err(e) => panic!("unexpected server error: {e}"),
                    }
                }
            })
        };

        for message in [&b"ping"[..], b"abc", b"z"] {
            ipc.write(client, message).unwrap();
            let reply = ipc.read(client, 64).unwrap();
            let mut expected = message.to_vec();
            expected.reverse();
            assert_eq!(reply, expected);
        }

        assert!(ipc.close(client));
        assert_eq!(server_thread.join().unwrap(), 3);
    }

    #[test]
    fn test_shutdown_releases_every_blocked_reader() {
        let ipc = emulation(true);
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let (_, fd) = ipc.create_default_pair().unwrap();
                let ipc = ipc.clone();
                thread::spawn(move || ipc.read(fd, 1))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        ipc.shutdown();

        for reader in readers {
            let result = reader.join().unwrap();
            assert!(
                matches!(result, Err(IpcError::Closed) | Err(IpcError::NoSuchFile(_))),
                "unexpected {result:?}"
            );
        }
        let mut fds = [0; 2];
        assert!(posix::pipe(&ipc, &mut fds) < 0);
    }

    #[test]
    fn test_non_blocking_reads_never_wait() {
        let ipc = emulation(false);
        let (a, b) = ipc.create_default_pair().unwrap();

        let start = std::time::Instant::now();
        assert_eq!(ipc.read(b, 16), Err(IpcError::NoData));
        assert!(start.elapsed() < WAIT);

        ipc.write(a, b"x").unwrap();
        assert_eq!(ipc.read(b, 16), Ok(b"x".to_vec()));
    }

    proptest! {
        #[test]
        fn prop_concatenated_writes_read_back_in_order(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..16), 1..12),
        ) {
            let ipc = emulation(false);
            let mut fds = [0; 2];
            prop_assert_eq!(posix::pipe(&ipc, &mut fds), 0);

            for chunk in &chunks {
                prop_assert_eq!(posix::write(&ipc, fds[0], chunk), chunk.len() as isize);
            }

            let total: usize = chunks.iter().map(Vec::len).sum();
            let mut buffer = vec![0u8; total + 8];
            let count = posix::read(&ipc, fds[1], &mut buffer);
            prop_assert_eq!(count, total as isize);
            let expected = chunks.concat();
            prop_assert_eq!(&buffer[..total], expected.as_slice());
        }
    }
}
