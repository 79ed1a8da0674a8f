#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use ut_meta as meta;
pub use ut_ptr as ptr;
pub use ut_utils as utils;
