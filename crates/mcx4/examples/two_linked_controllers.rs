use mcx4::{Board, McConfig, ControllerModel};

/// Two `MC4000`s on a shared GPIO circuit: `sender` counts up on `p0`, and
/// `receiver` echoes whatever it reads back into its own `acc`.
fn main() {
    env_logger::init();

    let mut board = Board::new();

    let mut sender = McConfig::with_model(ControllerModel::Mc4000)
        .name("sender")
        .build();
    let mut receiver = McConfig::with_model(ControllerModel::Mc4000)
        .name("receiver")
        .build();
    sender
        .port("p0")
        .expect("sender has a p0")
        .link(&receiver.port("p0").expect("receiver has a p0"))
        .expect("both ports are GPIO on different controllers");

    sender.compile("loop:\nadd 1\nmov acc p0\njmp loop\n");
    receiver.compile("mov p0 acc\n");

    board.add(sender);
    board.add(receiver);

    for cycle in 1..=5 {
        board.run(1).expect("no runtime errors");
        let receiver = board.controller_mut(1).expect("receiver is present");
        log::info!("cycle {cycle}: receiver.acc() = {}", receiver.acc());
    }
}
