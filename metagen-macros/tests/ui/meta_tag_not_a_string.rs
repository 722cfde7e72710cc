#![allow(dead_code)]

use metagen_macros::Meta;

#[derive(Meta)]
pub struct Widget {
    #[meta = 42]
    name: String,
}

fn main() {}
