//! Direct manipulation of network configuration inside the new network namespace.
//!
//! A namespace created with `CLONE_NEWNET` starts with only `lo`, and it is down. This module
//! brings it up, gives it a secondary address, and installs a default route, everything a
//! sandboxed process needs to talk to itself over loopback without touching the host's real
//! network stack.

use std::net::{self, Ipv4Addr};
use std::os::unix::prelude::*;
use std::ptr;

use libc;
use log::debug;

use super::err::{Error, Result};
use super::netlink;

pub const LOOPBACK: &str = "lo";

/// Secondary address assigned to `lo` inside the sandbox, with its prefix length.
pub const SANDBOX_ADDR: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 1);
pub const SANDBOX_PREFIX: u8 = 8;

/// Gateway used for the default route installed inside the sandbox.
pub const SANDBOX_GATEWAY: Ipv4Addr = Ipv4Addr::LOCALHOST;

fn ipv4_to_u32(addr: Ipv4Addr) -> u32 {
    u32::from_be_bytes(addr.octets())
}

/// Wrap a `struct ifreq`. Effectively an interface name plus a scratch union.
#[derive(Copy, Clone)]
struct IfReq(libc::ifreq);

impl IfReq {
    fn from_name<S: AsRef<str>>(name: S) -> Result<Self> {
        let rawname = name.as_ref().as_bytes();
        let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
        unsafe {
            if rawname.len() >= req.ifr_name.len() {
                return Err(Error::TooLong);
            }
            ptr::copy_nonoverlapping(
                rawname.as_ptr() as *const libc::c_char,
                req.ifr_name.as_mut_ptr(),
                rawname.len(),
            );
        }
        Ok(Self(req))
    }

    unsafe fn ioctl<FD: AsRawFd>(&mut self, fd: FD, req: libc::c_ulong) -> Result<()> {
        let err = libc::ioctl(fd.as_raw_fd(), req, &mut self.0);
        if err != 0 {
            return Err(Error::last_os_error(format!("ioctl(0x{:x})", req)));
        }
        Ok(())
    }
}

/// Network Interface Configurator. A (small) subset of `/sbin/ifconfig`.
pub struct IfConfig(net::UdpSocket);

impl IfConfig {
    pub fn new() -> Result<Self> {
        let sock = net::UdpSocket::bind("127.0.0.1:0")
            .map_err(|e| Error::os("bind() ifconfig socket", e))?;
        Ok(Self(sock))
    }

    /// Map a network interface name to its numeric index.
    pub fn ifindex<S: AsRef<str>>(&self, ifname: S) -> Result<u32> {
        let name = std::ffi::CString::new(ifname.as_ref())?;
        let idx = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if idx == 0 {
            return Err(Error::last_os_error("if_nametoindex"));
        }
        Ok(idx)
    }

    /// Lookup interface flags bit mask.
    pub fn ifflags<S: AsRef<str>>(&self, ifname: S) -> Result<i16> {
        let mut req = IfReq::from_name(ifname.as_ref())?;
        let ret = unsafe {
            req.ioctl(self.0.as_raw_fd(), libc::SIOCGIFFLAGS)?;
            req.0.ifr_ifru.ifru_flags
        };
        debug!("ifflags({:?}) -> {}", ifname.as_ref(), ret);
        Ok(ret)
    }

    /// Overwrite interface flags bit mask.
    pub fn set_ifflags<S: AsRef<str>>(&self, ifname: S, flags: i16) -> Result<()> {
        debug!("set_ifflags({:?}, {})", ifname.as_ref(), flags);
        let mut req = IfReq::from_name(ifname)?;
        unsafe {
            req.0.ifr_ifru.ifru_flags = flags;
            req.ioctl(self.0.as_raw_fd(), libc::SIOCSIFFLAGS)
        }
    }
}

/// Bring the `lo` interface UP. A fresh network namespace already carries `lo` with
/// `127.0.0.1/8` assigned; it just starts out administratively down.
pub fn configure_lo() -> Result<()> {
    debug!("configure loopback interface");

    let conf = IfConfig::new()?;

    let flags = conf.ifflags(LOOPBACK)?;
    if 0 == (flags as i32 & libc::IFF_UP) {
        debug!("bring lo UP");
        conf.set_ifflags(LOOPBACK, (flags as i32 | libc::IFF_UP) as i16)?;
    }

    Ok(())
}

/// Assign the sandbox's secondary address (`10.1.1.1/8`) to `lo` via a single `RTM_NEWADDR`
/// netlink request.
pub fn add_sandbox_address() -> Result<()> {
    let conf = IfConfig::new()?;
    let index = conf.ifindex(LOOPBACK)?;
    debug!(
        "assign {}/{} to {} (index {})",
        SANDBOX_ADDR, SANDBOX_PREFIX, LOOPBACK, index
    );
    netlink::add_address(index, SANDBOX_ADDR, SANDBOX_PREFIX)
}

/// Install a default route via `SANDBOX_GATEWAY` using `ioctl(SIOCADDRT)`.
pub fn add_default_route() -> Result<()> {
    debug!("add default route via {}", SANDBOX_GATEWAY);

    let conf = IfConfig::new()?;

    let mut rt: libc::rtentry = unsafe { std::mem::zeroed() };

    fn set_sockaddr_in(sa: &mut libc::sockaddr, addr: Ipv4Addr) {
        unsafe {
            let sin = sa as *mut _ as *mut libc::sockaddr_in;
            (*sin).sin_family = libc::AF_INET as libc::sa_family_t;
            (*sin).sin_port = 0;
            (*sin).sin_addr.s_addr = ipv4_to_u32(addr).to_be();
        }
    }

    set_sockaddr_in(&mut rt.rt_dst, Ipv4Addr::UNSPECIFIED);
    set_sockaddr_in(&mut rt.rt_genmask, Ipv4Addr::UNSPECIFIED);
    set_sockaddr_in(&mut rt.rt_gateway, SANDBOX_GATEWAY);
    rt.rt_flags = (libc::RTF_UP | libc::RTF_GATEWAY) as libc::c_ushort;

    if 0 != unsafe { libc::ioctl(conf.0.as_raw_fd(), libc::SIOCADDRT, &rt) } {
        return Err(Error::last_os_error("ioctl(SIOCADDRT)"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lo_flags() {
        let conf = IfConfig::new().unwrap();
        let flags = conf.ifflags(LOOPBACK).expect("flags");
        assert!((flags as i32 & libc::IFF_LOOPBACK) != 0, "flags {}", flags);
    }

    #[test]
    fn lo_index() {
        let conf = IfConfig::new().unwrap();
        let idx = conf.ifindex(LOOPBACK).expect("index");
        assert_eq!(idx, 1);
    }
}
