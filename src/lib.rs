#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use bindle_engine as engine;
pub use bindle_utils as utils;
