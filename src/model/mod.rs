pub mod history;
pub mod node;
pub mod requests;

pub use history::*;
pub use node::*;
pub use requests::*;
