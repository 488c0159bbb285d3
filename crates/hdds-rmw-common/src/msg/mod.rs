// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Graph messages exchanged between processes (`rmw_dds_common/msg`).
//!
//! Field order follows the ROS IDL: `gid`, then for each node its
//! namespace, name, reader gids and writer gids.

pub mod cursor;

use crate::error::{Error, Result};
use crate::gid::{Gid, RMW_GID_STORAGE_SIZE};
use cursor::{CdrReader, CdrWriter};

/// XCDR1 little-endian encapsulation (`CDR_LE`, options zero).
pub const CDR_LE_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// Topic on which participants announce their nodes.
pub const ROS_DISCOVERY_INFO_TOPIC: &str = "ros_discovery_info";
const MIN_NODE_CDR_SIZE: usize = 8 + 8 + 4 + 4;

pub const PARTICIPANT_ENTITIES_INFO_TYPE: &str = "rmw_dds_common::msg::dds_::ParticipantEntitiesInfo_";

/// A node and the endpoints associated with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeEntitiesInfo {
    pub node_namespace: String,
    pub node_name: String,
    pub reader_gid_seq: Vec<Gid>,
    pub writer_gid_seq: Vec<Gid>,
}

impl NodeEntitiesInfo {
    #[must_use]
    pub fn new(node_name: &str, node_namespace: &str) -> Self {
        Self {
            node_namespace: node_namespace.to_string(),
            node_name: node_name.to_string(),
            reader_gid_seq: Vec::new(),
            writer_gid_seq: Vec::new(),
        }
    }

    pub(crate) fn matches(&self, node_name: &str, node_namespace: &str) -> bool {
        self.node_name == node_name && self.node_namespace == node_namespace
    }
}

/// Full node list of one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantEntitiesInfo {
    pub gid: Gid,
    pub node_entities_info_seq: Vec<NodeEntitiesInfo>,
}

impl ParticipantEntitiesInfo {
    #[must_use]
    pub fn new(gid: Gid) -> Self {
        Self {
            gid,
            node_entities_info_seq: Vec::new(),
        }
    }

    /// Encode with the `CDR_LE` encapsulation header.
    pub fn to_cdr(&self) -> Result<Vec<u8>> {
        let mut w = CdrWriter::with_header(&CDR_LE_HEADER, self.encoded_size_hint())?;
        w.write_bytes(self.gid.as_bytes())?;
        w.write_len(self.node_entities_info_seq.len())?;
        for node in &self.node_entities_info_seq {
            w.write_string(&node.node_namespace)?;
            w.write_string(&node.node_name)?;
            write_gid_seq(&mut w, &node.reader_gid_seq)?;
            write_gid_seq(&mut w, &node.writer_gid_seq)?;
        }
        Ok(w.finish())
    }

    /// Decode a buffer produced by [`ParticipantEntitiesInfo::to_cdr`] or a
    /// remote peer. Trailing padding is ignored.
    pub fn from_cdr(data: &[u8]) -> Result<Self> {
        if data.len() < CDR_LE_HEADER.len() {
            return Err(Error::Serialization {
                offset: 0,
                reason: "missing encapsulation header".into(),
            });
        }
        let (header, body) = data.split_at(CDR_LE_HEADER.len());
        if header[..2] != CDR_LE_HEADER[..2] {
            return Err(Error::Serialization {
                offset: 0,
                reason: format!("unsupported encapsulation {:02x}{:02x}", header[0], header[1]),
            });
        }

        let mut r = CdrReader::new(body);
        let gid = Gid::from(read_gid(&mut r)?);
        // Smallest node: two empty strings (5 bytes, padded to 8) and two counts.
        let node_count = r.read_len(MIN_NODE_CDR_SIZE)?;
        let mut node_entities_info_seq = Vec::new();
        node_entities_info_seq.try_reserve_exact(node_count)?;
        for _ in 0..node_count {
            let node_namespace = r.read_string()?;
            let node_name = r.read_string()?;
            let reader_gid_seq = read_gid_seq(&mut r)?;
            let writer_gid_seq = read_gid_seq(&mut r)?;
            node_entities_info_seq.push(NodeEntitiesInfo {
                node_namespace,
                node_name,
                reader_gid_seq,
                writer_gid_seq,
            });
        }
        Ok(Self {
            gid,
            node_entities_info_seq,
        })
    }

    fn encoded_size_hint(&self) -> usize {
        let nodes: usize = self
            .node_entities_info_seq
            .iter()
            .map(|n| {
                n.node_namespace.len()
                    + n.node_name.len()
                    + 24
                    + (n.reader_gid_seq.len() + n.writer_gid_seq.len()) * RMW_GID_STORAGE_SIZE
            })
            .sum();
        RMW_GID_STORAGE_SIZE + 4 + nodes
    }
}

fn write_gid_seq(w: &mut CdrWriter, gids: &[Gid]) -> Result<()> {
    w.write_len(gids.len())?;
    for gid in gids {
        w.write_bytes(gid.as_bytes())?;
    }
    Ok(())
}

fn read_gid(r: &mut CdrReader<'_>) -> Result<[u8; RMW_GID_STORAGE_SIZE]> {
    let mut raw = [0u8; RMW_GID_STORAGE_SIZE];
    raw.copy_from_slice(r.read_bytes(RMW_GID_STORAGE_SIZE)?);
    Ok(raw)
}

fn read_gid_seq(r: &mut CdrReader<'_>) -> Result<Vec<Gid>> {
    let len = r.read_len(RMW_GID_STORAGE_SIZE)?;
    let mut gids = Vec::new();
    gids.try_reserve_exact(len)?;
    for _ in 0..len {
        gids.push(Gid::from(read_gid(r)?));
    }
    Ok(gids)
}
