pub mod lib_bmrs;
pub mod psr_archive;
