fn main() {
    // protox compiles the descriptor set in-process, so builds do not need a
    // system protoc install.
    let file_descriptors =
        protox::compile(["proto/driver.proto"], ["proto"]).expect("driver.proto must be valid");

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_fds(file_descriptors)
        .unwrap_or_else(|e| panic!("protobuf compile error: {e}"));

    println!("cargo:rerun-if-changed=proto/driver.proto");
}
