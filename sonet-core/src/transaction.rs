//! Social transactions and their payload

use crate::{CoreError, Height, Result, TxType};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Optional textual payload attached to a social transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    /// Account nickname
    pub name: Option<String>,
    pub url: Option<String>,
    /// Preferred language
    pub lang: Option<String>,
    pub about: Option<String>,
    pub avatar: Option<String>,
    /// Donation addresses, serialized by the wallet
    pub donations: Option<String>,
    pub pubkey: Option<String>,
}

impl Payload {
    /// Payload carrying only a nickname
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Fields in canonical order, as used by the payload digest
    fn fields(&self) -> [Option<&str>; 7] {
        [
            self.name.as_deref(),
            self.url.as_deref(),
            self.lang.as_deref(),
            self.about.as_deref(),
            self.avatar.as_deref(),
            self.donations.as_deref(),
            self.pubkey.as_deref(),
        ]
    }
}

/// A social-network action carried by a base-ledger transaction.
///
/// Hash, type and signer never change after construction. The height moves
/// from `None` to `Some` exactly once when the transaction is mined and goes
/// back to `None` only when its block is disconnected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialTransaction {
    hash: String,
    tx_type: TxType,
    address: String,
    referrer: Option<String>,
    payload: Option<Payload>,
    /// Digest written into the base transaction at signing time
    embedded_digest: Option<String>,
    height: Option<Height>,
    /// Position inside the block that mined it
    order: Option<u32>,
}

impl SocialTransaction {
    /// Create a pending transaction without payload
    pub fn new(hash: impl Into<String>, tx_type: TxType, address: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            tx_type,
            address: address.into(),
            referrer: None,
            payload: None,
            embedded_digest: None,
            height: None,
            order: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_embedded_digest(mut self, digest: impl Into<String>) -> Self {
        self.embedded_digest = Some(digest.into());
        self
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    /// Signer address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn embedded_digest(&self) -> Option<&str> {
        self.embedded_digest.as_deref()
    }

    pub fn height(&self) -> Option<Height> {
        self.height
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn is_pending(&self) -> bool {
        self.height.is_none()
    }

    /// Nickname as typed by the signer
    pub fn name(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.name.as_deref())
    }

    /// Nickname folded for comparison.
    ///
    /// Only ASCII letters are folded; other characters compare as is.
    pub fn lowercase_name(&self) -> String {
        self.name().map(str::to_ascii_lowercase).unwrap_or_default()
    }

    /// Mark the transaction as mined at `height`, position `order`
    pub fn confirm(&mut self, height: Height, order: u32) -> Result<()> {
        if let Some(existing) = self.height {
            return Err(CoreError::AlreadyConfirmed {
                hash: self.hash.clone(),
                height: existing,
            });
        }

        self.height = Some(height);
        self.order = Some(order);
        Ok(())
    }

    /// Return the transaction to the pending state after a reorg
    pub fn reset_height(&mut self) {
        self.height = None;
        self.order = None;
    }

    /// Total byte size of the payload fields and the referrer
    pub fn payload_size(&self) -> usize {
        let payload_bytes: usize = self
            .payload
            .as_ref()
            .map(|p| p.fields().iter().flatten().map(|f| f.len()).sum())
            .unwrap_or(0);

        payload_bytes + self.referrer.as_ref().map_or(0, String::len)
    }

    /// Canonical payload digest, hex encoded.
    ///
    /// Fields are concatenated in the order name, url, lang, about, avatar,
    /// donations, referrer, pubkey; absent fields contribute nothing.
    pub fn build_digest(&self) -> String {
        let [name, url, lang, about, avatar, donations, pubkey] = self
            .payload
            .as_ref()
            .map_or([None; 7], Payload::fields);

        let mut hasher = Sha3_256::new();
        for field in [name, url, lang, about, avatar, donations, self.referrer(), pubkey]
            .into_iter()
            .flatten()
        {
            hasher.update(field.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// JSON form used when handing transactions to storage collaborators
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
