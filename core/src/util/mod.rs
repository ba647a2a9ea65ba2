pub mod counting;


pub use counting::CountingWriter;
