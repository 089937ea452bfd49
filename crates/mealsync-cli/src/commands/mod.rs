pub(crate) mod day;
pub(crate) mod import;
pub(crate) mod meal;
pub(crate) mod net;
pub(crate) mod profile;
pub(crate) mod sync;
