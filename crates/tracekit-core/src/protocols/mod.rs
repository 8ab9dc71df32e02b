//! Header views for link, network and transport protocols.
//!
//! The modules follow one layered structure:
//! - `layout`: byte offsets, ranges and masks (source of truth)
//! - `common`: bounds-checked field access shared by every view
//! - `link`, `network`, `transport`: borrowed, fixed-layout views
//! - `options`: IPv4/TCP option iteration
//!
//! A view can only be constructed when its fixed part is inside the slice it
//! borrows, so accessors never read past the captured data. Views never
//! allocate and never copy packet bytes. Walking from one layer to the next,
//! with a shrinking length budget, is done by [`crate::decode`].

pub(crate) mod common;
pub mod layout;
pub mod link;
pub mod network;
pub mod options;
pub mod transport;

pub use link::{
    AtmCell, EthernetHeader, Ieee80211Header, LlcSnapHeader, MacAddr, PflogHeader, PosHeader,
    SllHeader, VlanHeader,
};
pub use network::{Ipv4Header, Ipv6ExtHeader, Ipv6Header, NetworkHeader};
pub use options::{HeaderOption, next_option};
pub use transport::{IcmpHeader, TcpHeader, UdpHeader};
