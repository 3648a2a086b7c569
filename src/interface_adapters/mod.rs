// Interface adapters: wire protocol and the reactive bridge.

pub mod bridge;
pub mod protocol;
pub mod utils;
