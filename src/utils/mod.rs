pub mod time;

/// Generates a 21 character url-safe unique id.
pub fn longid() -> String {
    nanoid::nanoid!()
}

/// Generates a short 10 character id.
pub fn shortid() -> String {
    nanoid::nanoid!(10)
}
