fn main() {
    elements_cli::run();
}
