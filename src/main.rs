fn main() {
    stepapp_lib::run()
}
