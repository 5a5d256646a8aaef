pub mod analysis;
pub mod profile_intake;
pub mod terminal;

pub use profile_intake::ProfileForm;
pub use terminal::Terminal;
