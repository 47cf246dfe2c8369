use serde::Deserialize;
use serde::Serialize;

use crate::RangeError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    WatchPut,
    WatchDelete,
}

impl CommandType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::WatchPut => "watch_put",
            CommandType::WatchDelete => "watch_delete",
        }
    }
}

/// Identity of a proposal: the node that originated it plus a per-node
/// sequence. Only the originating node replies to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId {
    pub node_id: u64,
    pub seq: u64,
}

/// Replicated mutation envelope. Key and value are already encoded, so
/// every replica writes identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub cmd_type: CommandType,
    pub range_id: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Command {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, RangeError> {
        bincode::deserialize(bytes)
            .map_err(|e| RangeError::CorruptRecord(format!("undecodable command: {}", e)))
    }

    /// Payload size reported to the split check
    pub fn payload_size(&self) -> u64 {
        (self.key.len() + self.value.len()) as u64
    }
}
