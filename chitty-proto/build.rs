use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    // Server, client and the descriptor set used by gRPC reflection
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("chittychat_descriptor.bin"))
        .compile_protos(&["proto/chitty.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/chitty.proto");
    Ok(())
}
