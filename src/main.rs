fn main() -> anyhow::Result<()> {
    dtc2vcf::cli::run()
}
