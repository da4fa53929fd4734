fn main() {
    gminer::main();
}
