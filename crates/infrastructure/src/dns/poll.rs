use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Returns the descriptors in `fds` that are readable.
///
/// With a zero `wait` this never blocks; it only reports what is ready now.
pub fn poll_readable(fds: &[RawFd], wait: Duration) -> io::Result<Vec<RawFd>> {
    if fds.is_empty() {
        return Ok(Vec::new());
    }

    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let timeout_ms = libc::c_int::try_from(wait.as_millis()).unwrap_or(libc::c_int::MAX);

    let ready = unsafe {
        libc::poll(
            pollfds.as_mut_ptr(),
            pollfds.len() as libc::nfds_t,
            timeout_ms,
        )
    };

    if ready < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Vec::new());
        }
        return Err(err);
    }

    Ok(pollfds
        .iter()
        .filter(|p| p.revents & (libc::POLLIN | libc::POLLERR) != 0)
        .map(|p| p.fd)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_idle_socket_not_ready() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let ready = poll_readable(&[socket.as_raw_fd()], Duration::ZERO).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn test_socket_with_datagram_is_ready() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"ping", receiver.local_addr().unwrap()).unwrap();

        let ready = poll_readable(&[receiver.as_raw_fd()], Duration::from_secs(2)).unwrap();
        assert_eq!(ready, vec![receiver.as_raw_fd()]);
    }
}
