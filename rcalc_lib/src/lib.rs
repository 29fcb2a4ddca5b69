use mimalloc::MiMalloc;

pub mod chunk;
pub mod compiler;
pub mod config;
pub mod scanner;
pub mod value;
pub mod vm;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
