// Resume inputs: the candidate document and the caller's required skills.

pub mod extract;
pub mod skills;
