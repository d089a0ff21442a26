mod member;
mod room;
mod room_directory;

pub use member::*;
pub use room::*;
pub use room_directory::*;
