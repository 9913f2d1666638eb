//! Patricia trie over IPv4/IPv6 prefixes.
//!
//! Nodes live in an arena and refer to each other by index, so an index
//! handed out for a node stays valid until that node is removed. IPv4
//! prefixes use the first 32 bits of the key, IPv6 all 128. Each family has
//! its own root, so equal leading bits never make a v4 and a v6 prefix
//! share a node. Internal "glue" nodes carry no prefix and always have two
//! children.

use proxyscan_domain::DomainError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub const MAX_BITS: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn max_bits(&self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

/// An address and the number of leading bits that are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix {
    family: Family,
    bitlen: u8,
    addr: [u8; 16],
}

impl Prefix {
    pub fn new(ip: IpAddr, bitlen: u8) -> Option<Self> {
        let (family, addr) = split(ip);
        if bitlen > family.max_bits() {
            return None;
        }

        let mut prefix = Self {
            family,
            bitlen,
            addr,
        };
        prefix.mask_host_bits();
        Some(prefix)
    }

    /// A full-length prefix for a single host.
    pub fn host(ip: IpAddr) -> Self {
        let (family, addr) = split(ip);
        Self {
            family,
            bitlen: family.max_bits(),
            addr,
        }
    }

    fn mask_host_bits(&mut self) {
        let bitlen = self.bitlen as usize;
        for (i, byte) in self.addr.iter_mut().enumerate() {
            let start = i * 8;
            if start >= bitlen {
                *byte = 0;
            } else if start + 8 > bitlen {
                *byte &= 0xffu8 << (8 - (bitlen - start));
            }
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn bitlen(&self) -> u8 {
        self.bitlen
    }

    pub fn ip(&self) -> IpAddr {
        match self.family {
            Family::V4 => IpAddr::V4(Ipv4Addr::new(
                self.addr[0],
                self.addr[1],
                self.addr[2],
                self.addr[3],
            )),
            Family::V6 => IpAddr::V6(Ipv6Addr::from(self.addr)),
        }
    }

    #[inline]
    fn bit(&self, index: u8) -> bool {
        bit_test(&self.addr, index)
    }
}

fn split(ip: IpAddr) -> (Family, [u8; 16]) {
    match ip {
        IpAddr::V4(v4) => {
            let mut addr = [0u8; 16];
            addr[..4].copy_from_slice(&v4.octets());
            (Family::V4, addr)
        }
        IpAddr::V6(v6) => (Family::V6, v6.octets()),
    }
}

#[inline]
fn bit_test(addr: &[u8; 16], index: u8) -> bool {
    let index = index as usize;
    addr[index >> 3] & (0x80 >> (index & 0x07)) != 0
}

/// First bit position (below `limit`) at which `a` and `b` differ, or `limit`.
fn first_differing_bit(a: &[u8; 16], b: &[u8; 16], limit: u8) -> u8 {
    let limit_usize = limit as usize;
    let mut bit = 0usize;
    while bit < limit_usize {
        let diff = a[bit / 8] ^ b[bit / 8];
        if diff != 0 {
            return (bit + diff.leading_zeros() as usize).min(limit_usize) as u8;
        }
        bit += 8;
    }
    limit
}

impl FromStr for Prefix {
    type Err = DomainError;

    /// Accepts `addr` or `addr/len`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidIpAddress(s.to_string());

        let (addr, bitlen) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len.parse::<u8>().map_err(|_| invalid())?)),
            None => (s, None),
        };

        let ip = addr.trim().parse::<IpAddr>().map_err(|_| invalid())?;

        match bitlen {
            Some(len) => Self::new(ip, len).ok_or_else(invalid),
            None => Ok(Self::host(ip)),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bitlen == self.family.max_bits() {
            write!(f, "{}", self.ip())
        } else {
            write!(f, "{}/{}", self.ip(), self.bitlen)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    family: Family,
    bit: u8,
    prefix: Option<Prefix>,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    data: Option<T>,
}

impl<T> Node<T> {
    fn new(family: Family, bit: u8, prefix: Option<Prefix>) -> Self {
        Self {
            family,
            bit,
            prefix,
            parent: None,
            left: None,
            right: None,
            data: None,
        }
    }
}

pub struct PatriciaTrie<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    v4_head: Option<NodeId>,
    v6_head: Option<NodeId>,
    prefixes: usize,
}

impl<T> Default for PatriciaTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatriciaTrie<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            v4_head: None,
            v6_head: None,
            prefixes: 0,
        }
    }

    /// Number of nodes that carry a prefix.
    pub fn len(&self) -> usize {
        self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes == 0
    }

    fn head(&self, family: Family) -> Option<NodeId> {
        match family {
            Family::V4 => self.v4_head,
            Family::V6 => self.v6_head,
        }
    }

    fn set_head(&mut self, family: Family, id: Option<NodeId>) {
        match family {
            Family::V4 => self.v4_head = id,
            Family::V6 => self.v6_head = id,
        }
    }

    // Ids reached through a head or a link always name live nodes.
    fn node(&self, id: NodeId) -> &Node<T> {
        match self.nodes.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale patricia node id {:?}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale patricia node id {:?}", id),
        }
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<Node<T>> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(node)
    }

    pub fn prefix(&self, id: NodeId) -> Option<&Prefix> {
        self.nodes.get(id.0)?.as_ref()?.prefix.as_ref()
    }

    pub fn data(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0)?.as_ref()?.data.as_ref()
    }

    /// Stores `data` on a node, returning what was there before.
    pub fn set_data(&mut self, id: NodeId, data: T) -> Option<T> {
        self.node_mut(id).data.replace(data)
    }

    fn child(&self, id: NodeId, addr: &Prefix) -> Option<NodeId> {
        let node = self.node(id);
        if node.bit < MAX_BITS && addr.bit(node.bit) {
            node.right
        } else {
            node.left
        }
    }

    /// Finds the node holding exactly `prefix`.
    pub fn search_exact(&self, prefix: &Prefix) -> Option<NodeId> {
        let mut id = self.head(prefix.family)?;

        while self.node(id).bit < prefix.bitlen {
            id = self.child(id, prefix)?;
        }

        let node = self.node(id);
        let stored = node.prefix.as_ref()?;
        if node.bit > prefix.bitlen || stored.family != prefix.family {
            return None;
        }

        let differ = first_differing_bit(&stored.addr, &prefix.addr, prefix.bitlen);
        (differ == prefix.bitlen).then_some(id)
    }

    /// Returns the node for `prefix`, creating it (and any glue) if needed.
    pub fn make_and_lookup(&mut self, prefix: Prefix) -> NodeId {
        let bitlen = prefix.bitlen;

        let family = prefix.family;

        let Some(head) = self.head(family) else {
            let id = self.alloc(Node::new(family, bitlen, Some(prefix)));
            self.set_head(family, Some(id));
            self.prefixes += 1;
            return id;
        };

        // Walk down to the closest existing node that carries a prefix.
        let mut id = head;
        loop {
            let node = self.node(id);
            if node.bit >= bitlen && node.prefix.is_some() {
                break;
            }
            match self.child(id, &prefix) {
                Some(next) => id = next,
                None => break,
            }
        }

        // Glue nodes always have two children, so the walk ends on a prefix.
        let Some(stored) = self.node(id).prefix else {
            unreachable!("patricia glue node {:?} is missing a child", id);
        };
        let test_addr = stored.addr;
        let check_bit = self.node(id).bit.min(bitlen);
        let differ_bit = first_differing_bit(&prefix.addr, &test_addr, check_bit);

        // Climb back to where the new prefix diverges.
        while let Some(parent) = self.node(id).parent {
            if self.node(parent).bit < differ_bit {
                break;
            }
            id = parent;
        }

        if differ_bit == bitlen && self.node(id).bit == bitlen {
            let node = self.node_mut(id);
            if node.prefix.is_none() {
                node.prefix = Some(prefix);
                self.prefixes += 1;
            }
            return id;
        }

        let new_id = self.alloc(Node::new(family, bitlen, Some(prefix)));
        self.prefixes += 1;

        let node_bit = self.node(id).bit;
        if node_bit == differ_bit {
            self.node_mut(new_id).parent = Some(id);
            if node_bit < MAX_BITS && prefix.bit(node_bit) {
                self.node_mut(id).right = Some(new_id);
            } else {
                self.node_mut(id).left = Some(new_id);
            }
            return new_id;
        }

        let old_parent = self.node(id).parent;

        if bitlen == differ_bit {
            // New prefix sits above the existing node.
            if bitlen < MAX_BITS && bit_test(&test_addr, bitlen) {
                self.node_mut(new_id).right = Some(id);
            } else {
                self.node_mut(new_id).left = Some(id);
            }
            self.node_mut(new_id).parent = old_parent;
            self.replace_child(old_parent, id, new_id);
            self.node_mut(id).parent = Some(new_id);
        } else {
            let glue_id = self.alloc(Node::new(family, differ_bit, None));
            self.node_mut(glue_id).parent = old_parent;
            if differ_bit < MAX_BITS && prefix.bit(differ_bit) {
                self.node_mut(glue_id).right = Some(new_id);
                self.node_mut(glue_id).left = Some(id);
            } else {
                self.node_mut(glue_id).right = Some(id);
                self.node_mut(glue_id).left = Some(new_id);
            }
            self.node_mut(new_id).parent = Some(glue_id);
            self.replace_child(old_parent, id, glue_id);
            self.node_mut(id).parent = Some(glue_id);
        }

        new_id
    }

    /// Points whatever referenced `old` (a parent or its family's head) at `new`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            None => {
                let family = self.node(new).family;
                self.set_head(family, Some(new));
            }
            Some(parent) => {
                let parent = self.node_mut(parent);
                if parent.right == Some(old) {
                    parent.right = Some(new);
                } else {
                    parent.left = Some(new);
                }
            }
        }
    }

    /// Removes the prefix held by `id`, returning its data.
    ///
    /// Ids of every other prefix-bearing node stay valid.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let (family, left, right, parent) = {
            let node = self.node(id);
            node.prefix.as_ref()?;
            (node.family, node.left, node.right, node.parent)
        };
        self.prefixes -= 1;

        match (left, right) {
            (Some(_), Some(_)) => {
                // Still needed to join its subtrees; demote to glue.
                let node = self.node_mut(id);
                node.prefix = None;
                node.data.take()
            }
            (Some(child), None) | (None, Some(child)) => {
                let data = self.release(id).and_then(|node| node.data);
                self.node_mut(child).parent = parent;
                self.replace_child(parent, id, child);
                data
            }
            (None, None) => {
                let data = self.release(id).and_then(|node| node.data);

                let Some(parent_id) = parent else {
                    self.set_head(family, None);
                    return data;
                };

                let sibling = {
                    let parent = self.node_mut(parent_id);
                    if parent.right == Some(id) {
                        parent.right = None;
                        parent.left
                    } else {
                        parent.left = None;
                        parent.right
                    }
                };

                if self.node(parent_id).prefix.is_some() {
                    return data;
                }

                // A glue node left with one child is spliced out as well.
                let grandparent = self.node(parent_id).parent;
                if let Some(sibling) = sibling {
                    self.node_mut(sibling).parent = grandparent;
                    self.replace_child(grandparent, parent_id, sibling);
                }
                self.release(parent_id);
                data
            }
        }
    }

    /// Prefix-bearing nodes in key order, IPv4 first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Prefix)> + '_ {
        let mut stack: Vec<NodeId> = self.v6_head.into_iter().chain(self.v4_head).collect();
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                let node = self.node(id);
                if let Some(right) = node.right {
                    stack.push(right);
                }
                if let Some(left) = node.left {
                    stack.push(left);
                }
                if let Some(prefix) = node.prefix.as_ref() {
                    return Some((id, prefix));
                }
            }
            None
        })
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.v4_head = None;
        self.v6_head = None;
        self.prefixes = 0;
    }
}
