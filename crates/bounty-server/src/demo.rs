use bounty_types::{BoardRules, BountyError, Principal};

use crate::state::AppState;

/// Walk the reference lifecycle against an in-process board and print each step.
pub async fn run(rules: BoardRules) -> anyhow::Result<()> {
    let state = AppState::new(rules);
    let deployer = Principal::from("deployer");
    let worker = Principal::from("wallet_1");

    let mut board = state.board.lock().await;
    let funded = board.deposit(&deployer, 100_000)?;
    state.commit(&board, &[funded]).await?;
    println!("Funded {deployer} with {}", board.balance(&deployer));

    let created = board.create_task(&deployer, 1000, "Test task description")?;
    state.commit(&board, &created.events).await?;
    let task_id = created.task_id().unwrap_or_default();
    println!("Created task {task_id}, task count = {}", board.task_count());

    let claimed = board.claim_task(&worker, task_id)?;
    state.commit(&board, &claimed.events).await?;
    println!("{worker} claimed task {task_id}");

    match board.cancel_task(&deployer, task_id) {
        Err(BountyError::CannotCancelClaimed(_)) => {
            println!("Cancel after claim rejected: escrow stays locked")
        }
        other => anyhow::bail!("Unexpected cancel outcome: {other:?}"),
    }

    let completed = board.complete_task(&worker, task_id)?;
    state.commit(&board, &completed.events).await?;
    println!(
        "{worker} completed task {task_id}, balance = {}",
        board.balance(&worker)
    );

    if let Err(e) = board.complete_task(&worker, task_id) {
        println!("Second completion rejected: {e}");
    }

    for receipt in [
        board.rate_worker(&deployer, task_id, 5)?,
        board.rate_creator(&worker, task_id, 4)?,
    ] {
        state.commit(&board, &receipt.events).await?;
    }
    println!(
        "Ratings: {worker} = {:?}, {deployer} = {:?}",
        board.user_rating(&worker),
        board.user_rating(&deployer)
    );
    drop(board);

    let entries = state.audit.all_entries().await?;
    println!(
        "Audit trail: {} entries, intact = {}",
        entries.len(),
        state.audit.verify_integrity().await?
    );
    for entry in entries {
        println!("  #{} {} by {}", entry.sequence, entry.kind, entry.actor);
    }
    Ok(())
}
