fn main() -> anyhow::Result<()> {
    sttcast_client_lib::run()
}
