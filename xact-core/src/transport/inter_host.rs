//! The two inter-host edge classes (§4.C, §6): TCP publish/subscribe on
//! `port_range.lo + edge_idx`. The owner host binds, the non-owner
//! connects — independent of which side publishes, since `owner_host_id`
//! may coincide with either `src_host_id` or `dst_host_id`. Direction
//! (who publishes, who subscribes) is fixed by `src_host_id`: the source
//! side always publishes, the destination side always subscribes.
//!
//! Payloads are opaque to the transport and length-prefixed: a 4-byte
//! big-endian length followed by the `rmp-serde` (MessagePack) encoding of
//! the [`Buffer`]. MessagePack, not `bincode`, because `Buffer` is a
//! `#[serde(untagged)]` enum and untagged deserialisation needs a
//! self-describing format.

use crate::errors::ExecutionError;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use xact_types::{Buffer, HostId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Publisher,
    Subscriber,
}

fn role_for(local_host: &HostId, src_host: &HostId) -> Role {
    if local_host == src_host {
        Role::Publisher
    } else {
        Role::Subscriber
    }
}

fn write_frame(stream: &mut TcpStream, item: &Buffer) -> Result<(), ExecutionError> {
    let payload = rmp_serde::to_vec(item).map_err(|e| ExecutionError::Serialization(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| ExecutionError::Serialization("frame too large".to_string()))?;
    stream.write_all(&len.to_be_bytes()).map_err(io_disconnected)?;
    stream.write_all(&payload).map_err(io_disconnected)?;
    Ok(())
}

fn read_frame(stream: &mut TcpStream) -> Result<Buffer, ExecutionError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).map_err(io_disconnected)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).map_err(io_disconnected)?;
    rmp_serde::from_slice(&payload).map_err(|e| ExecutionError::Serialization(e.to_string()))
}

fn io_disconnected(_: std::io::Error) -> ExecutionError {
    ExecutionError::TransportDisconnected("inter_host".to_string())
}

/// The owner-host side of an inter-host edge: binds `bind_addr` and
/// accepts the single peer connection (§4.C: "safe for a single producer
/// and single consumer").
pub struct InterHostServer {
    stream: TcpStream,
    role: Role,
}

impl InterHostServer {
    pub fn bind(
        bind_addr: impl ToSocketAddrs,
        port: u16,
        local_host: &HostId,
        src_host: &HostId,
    ) -> Result<Self, ExecutionError> {
        let listener = TcpListener::bind(bind_addr).map_err(|source| ExecutionError::BindFailed {
            host: local_host.clone(),
            port,
            source,
        })?;
        let (stream, _peer) = listener.accept().map_err(|source| ExecutionError::BindFailed {
            host: local_host.clone(),
            port,
            source,
        })?;
        Ok(Self {
            stream,
            role: role_for(local_host, src_host),
        })
    }
}

impl super::Transport for InterHostServer {
    fn blocking_read(&mut self) -> Result<Buffer, ExecutionError> {
        if self.role != Role::Subscriber {
            return Err(ExecutionError::other("this inter-host endpoint publishes; it cannot be read from"));
        }
        read_frame(&mut self.stream)
    }

    fn non_blocking_write(&mut self, item: Buffer) -> Result<(), ExecutionError> {
        if self.role != Role::Publisher {
            return Err(ExecutionError::other("this inter-host endpoint subscribes; it cannot be written to"));
        }
        write_frame(&mut self.stream, &item)
    }
}

/// The non-owner-host side of an inter-host edge: connects to the owner's
/// bound address.
pub struct InterHostClient {
    stream: TcpStream,
    role: Role,
}

impl InterHostClient {
    pub fn connect(
        server_addr: impl ToSocketAddrs,
        port: u16,
        local_host: &HostId,
        src_host: &HostId,
    ) -> Result<Self, ExecutionError> {
        let stream = TcpStream::connect(server_addr).map_err(|source| ExecutionError::ConnectFailed {
            host: local_host.clone(),
            port,
            source,
        })?;
        Ok(Self {
            stream,
            role: role_for(local_host, src_host),
        })
    }
}

impl super::Transport for InterHostClient {
    fn blocking_read(&mut self) -> Result<Buffer, ExecutionError> {
        if self.role != Role::Subscriber {
            return Err(ExecutionError::other("this inter-host endpoint publishes; it cannot be read from"));
        }
        read_frame(&mut self.stream)
    }

    fn non_blocking_write(&mut self, item: Buffer) -> Result<(), ExecutionError> {
        if self.role != Role::Publisher {
            return Err(ExecutionError::other("this inter-host endpoint subscribes; it cannot be written to"));
        }
        write_frame(&mut self.stream, &item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::net::TcpListener as StdListener;
    use std::thread;

    fn free_port() -> u16 {
        StdListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    #[test]
    fn publisher_writes_and_subscriber_reads_across_a_socket() {
        let port = free_port();
        let owner = HostId::new("owner");
        let peer = HostId::new("peer");

        let owner_for_server = owner.clone();
        let server_thread = thread::spawn(move || {
            let mut server = InterHostServer::bind(("127.0.0.1", port), port, &owner_for_server, &owner_for_server).unwrap();
            server.non_blocking_write(Buffer::I64(42)).unwrap();
        });

        // Give the listener a moment to bind before the client connects.
        thread::sleep(std::time::Duration::from_millis(50));
        let mut client = InterHostClient::connect(("127.0.0.1", port), port, &peer, &owner).unwrap();
        let received = client.blocking_read().unwrap();
        assert_eq!(received, Buffer::I64(42));

        server_thread.join().unwrap();
    }
}
