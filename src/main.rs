fn main() {
    bridgescan_pipeline::cli::run();
}
