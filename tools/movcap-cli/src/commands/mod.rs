pub mod check;
pub mod displays;
pub mod record;
