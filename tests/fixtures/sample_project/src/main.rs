fn main() {
    println!("{}", greeting());
}

fn greeting() -> &'static str {
    "hello from the sample project"
}
