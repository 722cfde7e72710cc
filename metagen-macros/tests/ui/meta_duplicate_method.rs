#![allow(dead_code)]

use metagen_macros::Meta;

#[derive(Meta)]
pub struct Twice {
    #[meta("sort")]
    a: Vec<u8>,
    #[meta("sort")]
    b: Vec<u8>,
}

fn main() {}
