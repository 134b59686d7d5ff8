fn main() {
    freegames::run();
}
