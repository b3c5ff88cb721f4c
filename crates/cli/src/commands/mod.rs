pub mod draw;
pub mod read;
pub mod spreads;

pub use draw::DrawCommand;
pub use read::ReadCommand;
pub use spreads::SpreadsCommand;
