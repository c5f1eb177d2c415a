//! Closed set of social transaction types and their wire codes

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Social transaction type.
///
/// The discriminants are the numeric codes carried on the wire and in stored
/// data; they never change once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
pub enum TxType {
    AccountUser = 100,
    AccountVideoServer = 101,
    AccountMessageServer = 102,
    AccountSetting = 103,
    BarteronAccount = 104,
    AccountDelete = 170,

    ContentPost = 200,
    ContentVideo = 201,
    ContentArticle = 202,
    ContentComment = 204,
    ContentCommentEdit = 205,
    ContentCommentDelete = 206,
    ContentDelete = 207,
    ContentStream = 209,
    ContentAudio = 210,
    BarteronOffer = 211,

    ActionScoreContent = 300,
    ActionScoreComment = 301,
    ActionSubscribe = 302,
    ActionSubscribePrivate = 303,
    ActionSubscribeCancel = 304,
    ActionBlocking = 305,
    ActionBlockingCancel = 306,
    ActionComplain = 307,
}

impl TxType {
    /// Every known type, in code order
    pub const ALL: [TxType; 24] = [
        TxType::AccountUser,
        TxType::AccountVideoServer,
        TxType::AccountMessageServer,
        TxType::AccountSetting,
        TxType::BarteronAccount,
        TxType::AccountDelete,
        TxType::ContentPost,
        TxType::ContentVideo,
        TxType::ContentArticle,
        TxType::ContentComment,
        TxType::ContentCommentEdit,
        TxType::ContentCommentDelete,
        TxType::ContentDelete,
        TxType::ContentStream,
        TxType::ContentAudio,
        TxType::BarteronOffer,
        TxType::ActionScoreContent,
        TxType::ActionScoreComment,
        TxType::ActionSubscribe,
        TxType::ActionSubscribePrivate,
        TxType::ActionSubscribeCancel,
        TxType::ActionBlocking,
        TxType::ActionBlockingCancel,
        TxType::ActionComplain,
    ];

    /// Types that create, edit or remove a user account
    pub const ACCOUNT_EDITS: [TxType; 2] = [TxType::AccountUser, TxType::AccountDelete];

    /// Numeric wire code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decode a wire code
    pub fn from_code(code: u32) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|tx_type| tx_type.code() == code)
            .ok_or(CoreError::UnknownTxType(code))
    }

    /// Whether this type is one of `types`
    pub fn is_in(self, types: &[TxType]) -> bool {
        types.contains(&self)
    }
}

impl TryFrom<u32> for TxType {
    type Error = CoreError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<TxType> for u32 {
    fn from(tx_type: TxType) -> Self {
        tx_type.code()
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}
