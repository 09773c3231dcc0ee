use cucumber::given;
use order_engine::test_utils::system::TestSystem;

use crate::cucumber::OrderWorld;

#[given("a fresh install")]
async fn fresh_database(world: &mut OrderWorld) {
    let system = TestSystem::new().await;
    world.system = Some(system);
}
