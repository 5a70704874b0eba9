pub mod p2d;
