mod params;

pub use params::{ChainParams, NetworkType, NsFixActivation};
