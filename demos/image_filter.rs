//! Example: Image Filtering
//!
//! Blurs a small synthetic image with `imconv` under each missing-value
//! policy and compares the size of a full `conv2` result.
//!
//! Run with: cargo run --example image_filter

use mml::{run_source, MissingPolicy, MmlConfig};

const PROGRAM: &str = "\
img = zeros(5, 5)
img[2][2] = ones(3, 3) * 9
k = ones(3, 3) / 9

zero = imconv(img, k, 0)
wrap = imconv(img, k, 1)
clamp = imconv(img, k, 2)
default = imconv(img, k)
full = size(conv2(img, k))
";

fn main() {
    println!("=== MML Image Filtering ===\n");

    for policy in [MissingPolicy::Zero, MissingPolicy::Clamp] {
        let config = MmlConfig::new(true, policy);
        println!("Default imconv policy: {:?}", policy);

        let env = run_source(PROGRAM, &config).unwrap();
        for name in ["img", "zero", "wrap", "clamp", "default", "full"] {
            if let Some(value) = env.get(name) {
                println!("  {:<8} = {}", name, value);
            }
        }
        println!();
    }
}
