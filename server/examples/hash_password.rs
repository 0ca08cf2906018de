use sg_server::auth::password::BCRYPT_COST;

fn main() {
    let password = std::env::args().nth(1).expect("Usage: hash_password <password>");
    let hash = bcrypt::hash(password, BCRYPT_COST).expect("Failed to hash password");
    println!("{hash}");
}
