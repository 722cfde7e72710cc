#![allow(dead_code)]

use metagen_macros::Meta;

#[derive(Meta)]
pub struct Wrapper<T> {
    #[meta("getter")]
    value: T,
}

fn main() {}
