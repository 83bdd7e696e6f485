fn main() {
    nih_plug::nih_export_standalone::<revoice_plugin::RevoicePlugin>();
}
