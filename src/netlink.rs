//! Minimal `AF_NETLINK`/`NETLINK_ROUTE` client.
//!
//! The sandbox needs exactly one netlink operation, adding a secondary IPv4 address to an
//! existing interface (`RTM_NEWADDR`), which `SIOCSIFADDR` cannot express because an ioctl can
//! only ever set a single address per interface. Rather than pull in a netlink crate for one
//! message type, this builds the request by hand, following the same raw-syscall style `net.rs`
//! already uses for ifreq/ioctl.

use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::unix::io::RawFd;

use libc;
use log::debug;

use super::err::{Error, Result};

const NLMSG_ALIGNTO: usize = 4;

fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

fn rta_align(len: usize) -> usize {
    nlmsg_align(len)
}

/// Append a `rtattr` (type, payload) to `buf`, padded to the required alignment.
fn push_rtattr(buf: &mut Vec<u8>, rta_type: u16, payload: &[u8]) {
    let rta_len = (mem::size_of::<libc::rtattr>() + payload.len()) as u16;
    buf.extend_from_slice(&rta_len.to_ne_bytes());
    buf.extend_from_slice(&rta_type.to_ne_bytes());
    buf.extend_from_slice(payload);
    let pad = rta_align(payload.len() + mem::size_of::<libc::rtattr>()) - payload.len()
        - mem::size_of::<libc::rtattr>();
    buf.extend(std::iter::repeat(0u8).take(pad));
}

const IFA_ADDRESS: u16 = 1;
const IFA_LOCAL: u16 = 2;

fn open_route_socket() -> Result<RawFd> {
    let fd = unsafe { libc::socket(libc::AF_NETLINK, libc::SOCK_RAW, libc::NETLINK_ROUTE) };
    if fd < 0 {
        return Err(Error::last_os_error("socket(AF_NETLINK)"));
    }

    let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
    addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;

    let ret = unsafe {
        libc::bind(
            fd,
            &addr as *const _ as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        let err = Error::last_os_error("bind(AF_NETLINK)");
        unsafe { libc::close(fd) };
        return Err(err);
    }

    Ok(fd)
}

/// Add `addr/prefixlen` to the interface identified by `index`, equivalent to
/// `ip addr add <addr>/<prefixlen> dev <ifname>`.
pub fn add_address(index: u32, addr: Ipv4Addr, prefixlen: u8) -> Result<()> {
    debug!("netlink add_address(index={}, {}/{})", index, addr, prefixlen);

    let fd = open_route_socket()?;
    let result = add_address_on(fd, index, addr, prefixlen);
    unsafe { libc::close(fd) };
    result
}

fn add_address_on(fd: RawFd, index: u32, addr: Ipv4Addr, prefixlen: u8) -> Result<()> {
    let ifaddrmsg = libc::ifaddrmsg {
        ifa_family: libc::AF_INET as u8,
        ifa_prefixlen: prefixlen,
        ifa_flags: 0,
        ifa_scope: 0,
        ifa_index: index,
    };

    let mut attrs = Vec::new();
    push_rtattr(&mut attrs, IFA_LOCAL, &addr.octets());
    push_rtattr(&mut attrs, IFA_ADDRESS, &addr.octets());

    let payload_len = mem::size_of::<libc::ifaddrmsg>() + attrs.len();
    let total_len = nlmsg_align(mem::size_of::<libc::nlmsghdr>()) + payload_len;

    let hdr = libc::nlmsghdr {
        nlmsg_len: total_len as u32,
        nlmsg_type: libc::RTM_NEWADDR,
        nlmsg_flags: (libc::NLM_F_REQUEST | libc::NLM_F_CREATE | libc::NLM_F_EXCL | libc::NLM_F_ACK) as u16,
        nlmsg_seq: 1,
        nlmsg_pid: 0,
    };

    let mut buf = Vec::with_capacity(total_len);
    unsafe {
        let hdr_bytes = std::slice::from_raw_parts(
            &hdr as *const _ as *const u8,
            mem::size_of::<libc::nlmsghdr>(),
        );
        buf.extend_from_slice(hdr_bytes);
        let ifa_bytes = std::slice::from_raw_parts(
            &ifaddrmsg as *const _ as *const u8,
            mem::size_of::<libc::ifaddrmsg>(),
        );
        buf.extend_from_slice(ifa_bytes);
    }
    buf.extend_from_slice(&attrs);

    let sent = unsafe { libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
    if sent < 0 {
        return Err(Error::last_os_error("send(RTM_NEWADDR)"));
    }

    recv_ack(fd)
}

/// Block for the kernel's reply and translate a `nlmsgerr` into our `Result`.
fn recv_ack(fd: RawFd) -> Result<()> {
    let mut rx = [0u8; 4096];
    let n = unsafe {
        libc::recv(fd, rx.as_mut_ptr() as *mut libc::c_void, rx.len(), 0)
    };
    if n < 0 {
        return Err(Error::last_os_error("recv(netlink ack)"));
    }
    let n = n as usize;
    if n < mem::size_of::<libc::nlmsghdr>() {
        return Err(Error::os(
            "recv(netlink ack)",
            io::Error::new(io::ErrorKind::UnexpectedEof, "short netlink reply"),
        ));
    }

    let hdr = unsafe { &*(rx.as_ptr() as *const libc::nlmsghdr) };
    if hdr.nlmsg_type != libc::NLMSG_ERROR as u16 {
        return Err(Error::os(
            "netlink reply",
            io::Error::new(io::ErrorKind::Other, "unexpected message type"),
        ));
    }

    let err_off = nlmsg_align(mem::size_of::<libc::nlmsghdr>());
    if n < err_off + mem::size_of::<libc::c_int>() {
        return Err(Error::os(
            "netlink reply",
            io::Error::new(io::ErrorKind::UnexpectedEof, "truncated nlmsgerr"),
        ));
    }
    let errno = unsafe { *(rx.as_ptr().add(err_off) as *const libc::c_int) };

    if errno == 0 {
        Ok(())
    } else {
        Err(Error::os(
            "RTM_NEWADDR",
            io::Error::from_raw_os_error(-errno),
        ))
    }
}
