//! Build script for compiling the demo Protocol Buffer definitions.
//!
//! Generated services decode requests with `janus_host::ValidatingCodec`, so
//! every inbound message is validated before the handler sees it.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/janus_demo.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .codec_path("janus_host::ValidatingCodec")
        .compile_protos(&["../../proto/janus_demo.proto"], &["../../proto"])?;

    Ok(())
}
