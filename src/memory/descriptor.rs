//! Typed encoding of translation-table descriptors.
//!
//! A descriptor is a 64-bit word whose low two bits discriminate it into
//! one of `Fault` / `Table` / `Block` / `Page`, expressed here as a
//! genuine Rust enum built on a `bitfield-struct` raw word.

use crate::memory::address::PhysicalAddress;
use bitfield_struct::bitfield;

/// Discriminant occupying the low two bits of every descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Kind {
    Fault = 0b00,
    Block = 0b01,
    TableOrPage = 0b11,
}

impl Kind {
    const fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            0b00 => Some(Self::Fault),
            0b01 => Some(Self::Block),
            0b11 => Some(Self::TableOrPage),
            _ => None,
        }
    }
}

/// Index into `MAIR_EL1` describing the memory type of a leaf mapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemoryAttribute {
    /// `MAIR_EL1` index 0: device-nGnRnE.
    Device,
    /// `MAIR_EL1` index 1: normal, non-cacheable.
    NormalNonCacheable,
}

impl MemoryAttribute {
    const fn index(self) -> u64 {
        match self {
            Self::Device => crate::config::ATTR_DEVICE_NGNRNE,
            Self::NormalNonCacheable => crate::config::ATTR_NORMAL_NC,
        }
    }

    const fn from_index(index: u64) -> Self {
        match index {
            crate::config::ATTR_DEVICE_NGNRNE => Self::Device,
            _ => Self::NormalNonCacheable,
        }
    }
}

/// Access permissions for a leaf mapping, encoded directly as the
/// architectural `AP[2:1]` bits: bit 0 = EL1 read-only, bit 1 =
/// EL0 access allowed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessPermission {
    /// Kernel read/write, no user access.
    KernelRwUserNone,
    /// Kernel read/write, user read/write.
    KernelRwUserRw,
    /// Kernel read-only, no user access.
    KernelRoUserNone,
    /// Kernel read-only, user read-only.
    KernelRoUserRw,
}

impl AccessPermission {
    const fn bits(self) -> u64 {
        match self {
            Self::KernelRwUserNone => 0b00,
            Self::KernelRwUserRw => 0b01,
            Self::KernelRoUserNone => 0b10,
            Self::KernelRoUserRw => 0b11,
        }
    }

    const fn from_bits(bits: u64) -> Self {
        match bits {
            0b00 => Self::KernelRwUserNone,
            0b01 => Self::KernelRwUserRw,
            0b10 => Self::KernelRoUserNone,
            _ => Self::KernelRoUserRw,
        }
    }
}

/// The raw 64-bit word shared by every descriptor variant. Table
/// descriptors leave the attribute/permission bits clear; leaf (Block,
/// Page) descriptors populate them. Address bits below a level's block
/// size are simply zero and ignored by callers that know the level.
#[bitfield(u64, debug = false)]
struct RawWord {
    #[bits(2)]
    kind: u8,
    #[bits(3)]
    attr_index: u8,
    ns: bool,
    #[bits(2)]
    ap: u8,
    #[bits(2)]
    sh: u8,
    af: bool,
    ng: bool,
    #[bits(36)]
    addr: u64,
    #[bits(4)]
    _res0: u8,
    contiguous: bool,
    pxn: bool,
    uxn: bool,
    #[bits(9)]
    _ignored: u16,
}

/// A decoded, level-agnostic descriptor. Individual levels only accept a
/// subset of these; the level views enforce that subset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Descriptor {
    /// Produces a translation fault on access.
    Fault,
    /// Points at the next-level table.
    Table(PhysicalAddress),
    /// A 1 GiB (L1) or 2 MiB (L2) block mapping.
    Block(LeafAttributes),
    /// A 4 KiB (L3) page mapping.
    Page(LeafAttributes),
}

/// Attributes shared by Block and Page descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LeafAttributes {
    pub addr: PhysicalAddress,
    pub memory_attribute: MemoryAttribute,
    pub access_permission: AccessPermission,
    pub access_flag: bool,
}

const ADDR_SHIFT: u32 = 12;
const ADDR_MASK: u64 = (1 << 36) - 1;

impl Descriptor {
    /// Encodes `self` into a raw 64-bit descriptor word.
    pub const fn to_bits(self) -> u64 {
        match self {
            Self::Fault => 0,
            Self::Table(pa) => RawWord::new()
                .with_kind(Kind::TableOrPage as u8)
                .with_addr((pa.as_u64() >> ADDR_SHIFT) & ADDR_MASK)
                .into_bits(),
            Self::Block(attrs) => Self::encode_leaf(Kind::Block, attrs),
            Self::Page(attrs) => Self::encode_leaf(Kind::TableOrPage, attrs),
        }
    }

    const fn encode_leaf(kind: Kind, attrs: LeafAttributes) -> u64 {
        RawWord::new()
            .with_kind(kind as u8)
            .with_attr_index(attrs.memory_attribute.index() as u8)
            .with_ap(attrs.access_permission.bits() as u8)
            .with_af(attrs.access_flag)
            .with_addr((attrs.addr.as_u64() >> ADDR_SHIFT) & ADDR_MASK)
            .into_bits()
    }

    /// Decodes a raw descriptor word. `is_leaf_level` is `true` for level 3
    /// (where `kind = TableOrPage` means Page rather than Table).
    pub fn from_bits(bits: u64, is_leaf_level: bool) -> Option<Self> {
        let raw = RawWord::from_bits(bits);
        match Kind::from_bits(raw.kind() as u64)? {
            Kind::Fault => Some(Self::Fault),
            Kind::Block => Some(Self::Block(Self::decode_leaf(&raw))),
            Kind::TableOrPage if is_leaf_level => Some(Self::Page(Self::decode_leaf(&raw))),
            Kind::TableOrPage => Some(Self::Table(PhysicalAddress::new(
                (raw.addr() & ADDR_MASK) << ADDR_SHIFT,
            ))),
        }
    }

    fn decode_leaf(raw: &RawWord) -> LeafAttributes {
        LeafAttributes {
            addr: PhysicalAddress::new((raw.addr() & ADDR_MASK) << ADDR_SHIFT),
            memory_attribute: MemoryAttribute::from_index(raw.attr_index() as u64),
            access_permission: AccessPermission::from_bits(raw.ap() as u64),
            access_flag: raw.af(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    #[kernel_test]
    fn table_descriptor_round_trips_address_and_low_bits() {
        for raw_addr in [0_u64, 0x1000, 0x1_0000_0000] {
            let addr = raw_addr & 0x0000_FFFF_FFFF_F000;
            let descriptor = Descriptor::Table(PhysicalAddress::new(addr));
            let bits = descriptor.to_bits();
            assert_eq!(bits & 0b11, 0b11);
            match Descriptor::from_bits(bits, false) {
                Some(Descriptor::Table(decoded)) => {
                    assert_eq!(decoded, PhysicalAddress::new(addr))
                }
                other => panic!("expected Table, got {other:?}"),
            }
        }
    }

    #[kernel_test]
    fn fault_is_all_zero_low_bits() {
        assert_eq!(Descriptor::Fault.to_bits() & 0b11, 0b00);
    }

    #[kernel_test]
    fn block_and_page_share_leaf_encoding() {
        let attrs = LeafAttributes {
            addr: PhysicalAddress::new(0x2000_0000),
            memory_attribute: MemoryAttribute::NormalNonCacheable,
            access_permission: AccessPermission::KernelRwUserRw,
            access_flag: true,
        };
        let block_bits = Descriptor::Block(attrs).to_bits();
        let page_bits = Descriptor::Page(attrs).to_bits();
        assert_eq!(block_bits & 0b11, 0b01);
        assert_eq!(page_bits & 0b11, 0b11);

        match Descriptor::from_bits(block_bits, false) {
            Some(Descriptor::Block(decoded)) => assert_eq!(decoded, attrs),
            other => panic!("expected Block, got {other:?}"),
        }
        match Descriptor::from_bits(page_bits, true) {
            Some(Descriptor::Page(decoded)) => assert_eq!(decoded, attrs),
            other => panic!("expected Page, got {other:?}"),
        }
    }

    #[kernel_test]
    fn discriminates_exactly_one_variant_per_level() {
        let bits = Descriptor::Block(LeafAttributes {
            addr: PhysicalAddress::new(0),
            memory_attribute: MemoryAttribute::Device,
            access_permission: AccessPermission::KernelRwUserNone,
            access_flag: false,
        })
        .to_bits();
        assert!(matches!(
            Descriptor::from_bits(bits, false),
            Some(Descriptor::Block(_))
        ));
        // At the leaf level the same low bits (`0b01`) still decode to Block,
        // since `is_leaf_level` only disambiguates the `0b11` encoding.
        assert!(matches!(
            Descriptor::from_bits(bits, true),
            Some(Descriptor::Block(_))
        ));
    }
}
