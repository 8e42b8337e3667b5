//! Command implementations for the Wagerline CLI
//!
//! Each `*_command` drives one library operation and prints the result.
//! Interactive games read the next action from stdin.

use std::io::{self, BufRead, Write};

use wagerline::gaming::blackjack::BlackjackHand;
use wagerline::gaming::minesweeper::MinesweeperBoard;
use wagerline::gaming::preview;
use wagerline::models::format_hand;
use wagerline::{
    BlackjackTable, CoinRequest, DiceTable, Error, MinesweeperField, Result, RouletteWheel,
    Settlement, VideoPokerMachine,
};

use crate::app_config::{parse_dice_bet, parse_hold_indices, parse_roulette_bet};
use crate::app_state::WagerlineApp;

/// Print `message` and read one trimmed line
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_settlement(settlement: &Settlement, won: bool) {
    if won {
        println!("🎉 Payout: {} coins", settlement.payout);
    }
    println!("💰 Balance: {} coins", settlement.coins);
    if settlement.is_bankrupt {
        println!("💸 You're out of coins. Run 'wagerline coins recover' to ask for a top-up.");
    }
}

fn print_coin_request(request: &CoinRequest) {
    let reviewer = request
        .reviewed_by
        .as_ref()
        .map(|r| format!(" by {}", r.username))
        .unwrap_or_default();
    println!(
        "  #{} {} coins [{}{}] {}",
        request.id,
        request.amount,
        request.status,
        reviewer,
        request.created_at.format("%Y-%m-%d %H:%M")
    );
    if !request.reason.is_empty() {
        println!("     \"{}\"", request.reason);
    }
}

pub mod commands {
    use super::*;

    pub async fn register_command(
        app: &WagerlineApp,
        username: &str,
        email: &str,
        password: Option<String>,
    ) -> Result<()> {
        let password = match password {
            Some(p) => p,
            None => prompt("🔑 Password: ")?,
        };
        let profile = app.account.register(username, email, &password).await?;
        println!("✅ Welcome, {}! You start with {} coins.", profile.user.username, profile.coins);
        Ok(())
    }

    pub async fn login_command(
        app: &WagerlineApp,
        username: &str,
        password: Option<String>,
    ) -> Result<()> {
        let password = match password {
            Some(p) => p,
            None => prompt("🔑 Password: ")?,
        };
        let profile = app.account.login(username, &password).await?;
        println!("✅ Signed in as {} ({} coins)", profile.user.username, profile.coins);
        Ok(())
    }

    pub fn logout_command(app: &WagerlineApp) -> Result<()> {
        app.account.logout()?;
        println!("👋 Signed out");
        Ok(())
    }

    pub async fn profile_command(app: &WagerlineApp) -> Result<()> {
        let profile = app.account.refresh().await?;
        println!("👤 {} <{}>", profile.user.username, profile.user.email);
        if profile.user.is_staff {
            println!("  🛡️  Staff");
        }
        println!("  💰 Coins: {}", profile.coins);
        println!("  🎲 Games played: {}", profile.games_played);
        println!("  📈 Total wagered: {}", profile.total_wagered);
        println!("  🏆 Total won: {}", profile.total_won);
        println!("  📉 Total lost: {}", profile.total_lost);
        println!("  📅 Member since {}", profile.created_at.format("%Y-%m-%d"));
        if profile.is_bankrupt {
            println!("  💸 Bankrupt");
        }
        Ok(())
    }

    pub async fn history_command(app: &WagerlineApp, limit: usize) -> Result<()> {
        let history = app.account.history().await?;
        if history.is_empty() {
            println!("🎲 No games played yet");
            return Ok(());
        }

        println!("📜 Recent games:");
        for entry in history.iter().take(limit) {
            let outcome = if entry.won { "✅ won" } else { "❌ lost" };
            println!(
                "  {} {:<12} bet {:>6}  payout {:>6}  {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.game_type,
                entry.bet_amount,
                entry.payout,
                outcome
            );
        }
        Ok(())
    }

    pub async fn learn_command(app: &WagerlineApp) -> Result<()> {
        let content = app.account.education().await?;
        println!("📚 {}", content.title);
        for section in &content.sections {
            println!();
            println!("## {}", section.title);
            println!("{}", section.content);
        }
        if !content.math_breakdown.is_empty() {
            println!();
            println!("🧮 House edge by game:");
            for (game, edge) in &content.math_breakdown {
                println!(
                    "  {:<12} base {:<8} here {:<8} expected loss per 100 bets: {}",
                    game, edge.base_house_edge, edge.our_house_edge, edge.expected_loss_per_100_bets
                );
            }
        }
        Ok(())
    }

    pub async fn roulette_command(
        app: &WagerlineApp,
        bet_type: &str,
        bet_value: &str,
        bet: i64,
    ) -> Result<()> {
        let wager = parse_roulette_bet(bet_type, bet_value).map_err(Error::Validation)?;
        let wheel = RouletteWheel::new(app.account.clone());

        let result = wheel.spin(&wager, bet).await?;
        println!("🎡 The ball lands on {} ({:?})", result.result, result.color);
        println!("{}", result.message);
        print_settlement(&result.settlement, result.won);
        Ok(())
    }

    pub async fn dice_command(
        app: &WagerlineApp,
        bet_type: &str,
        bet_value: &str,
        bet: i64,
    ) -> Result<()> {
        let wager = parse_dice_bet(bet_type, bet_value).map_err(Error::Validation)?;
        if let Some(multiplier) = wager.advisory_multiplier() {
            println!("ℹ️  Pays about {} (confirmed by the house)", multiplier);
        }
        let table = DiceTable::new(app.account.clone());

        let result = table.roll(&wager, bet).await?;
        println!("🎲 {} + {} = {}", result.die1, result.die2, result.total);
        println!("{}", result.message);
        print_settlement(&result.settlement, result.won);
        Ok(())
    }

    pub async fn blackjack_command(app: &WagerlineApp, bet: i64) -> Result<()> {
        let mut table = BlackjackTable::new(app.account.clone());

        let mut hand = table.deal(bet).await?;
        loop {
            show_blackjack(&hand);
            if let Some(settlement) = hand.status.settlement() {
                let won = matches!(hand.status.label(), "win" | "blackjack" | "push");
                print_settlement(settlement, won);
                return Ok(());
            }

            let options = if table.can_double() {
                "[h]it, [s]tand, [d]ouble? "
            } else {
                "[h]it, [s]tand? "
            };
            let next = match prompt(options)?.as_str() {
                "h" | "hit" => table.hit().await,
                "s" | "stand" => table.stand().await,
                "d" | "double" => table.double().await,
                other => {
                    println!("❓ Unknown action '{}'", other);
                    continue;
                }
            };

            match next {
                Ok(next) => hand = next,
                Err(e) if e.requires_login() || !table.in_round() => return Err(e),
                Err(e) => println!("⚠️  {}", e.user_message()),
            }
        }
    }

    fn show_blackjack(hand: &BlackjackHand) {
        let dealer_total = hand.dealer_value.or(hand.dealer_visible);
        match dealer_total {
            Some(total) => println!("🃏 Dealer: {} ({})", format_hand(&hand.dealer_hand), total),
            None => println!("🃏 Dealer: {}", format_hand(&hand.dealer_hand)),
        }
        println!("🫵 You:    {} ({})", format_hand(&hand.player_hand), hand.player_value);
        if !hand.message.is_empty() {
            println!("{}", hand.message);
        }
    }

    pub async fn poker_command(app: &WagerlineApp, bet: i64) -> Result<()> {
        let mut machine = VideoPokerMachine::new(app.account.clone());

        let dealt = machine.deal(bet).await?;
        println!("🃏 {}", format_hand(&dealt.hand));
        if let Some(settlement) = dealt.status.settlement() {
            print_settlement(settlement, false);
            return Ok(());
        }

        let result = loop {
            let input = prompt("✋ Positions to hold (0-4, e.g. 0,2,3; blank for none): ")?;
            let holds = match parse_hold_indices(&input) {
                Ok(holds) => holds,
                Err(e) => {
                    println!("⚠️  {}", e);
                    continue;
                }
            };
            match machine.draw(&holds).await {
                Ok(result) => break result,
                Err(Error::Validation(message)) => println!("⚠️  {}", message),
                Err(e) => return Err(e),
            }
        };

        println!("🃏 {}", format_hand(&result.hand));
        if let Some(hand_type) = &result.hand_type {
            match preview::poker_pay_multiplier(hand_type) {
                Some(multiplier) => println!("🏅 {} ({})", hand_type, multiplier),
                None => println!("🏅 {}", hand_type),
            }
        }
        println!("{}", result.message);
        if let Some(settlement) = result.status.settlement() {
            print_settlement(settlement, settlement.payout > 0);
        }
        Ok(())
    }

    pub async fn mines_command(app: &WagerlineApp, bet: i64, grid: u8, mines: u8) -> Result<()> {
        let mut field = MinesweeperField::new(app.account.clone());

        let mut board = field.create(bet, grid, mines).await?;
        loop {
            show_board(&board);
            if let Some(reveal) = board.status.reveal() {
                let settlement = reveal.settlement();
                print_settlement(&settlement, settlement.payout > 0);
                return Ok(());
            }

            if let (Some(win), Some(total)) = (field.potential_win(), field.cashout_value()) {
                println!("📈 {}x  potential win {}  cashout {}", board.multiplier, win, total);
            }

            let input = prompt("🔍 Tile number to reveal, or [c]ashout: ")?;
            let next = match input.as_str() {
                "c" | "cashout" => field.cashout().await,
                other => match other.parse::<usize>() {
                    Ok(tile) => field.reveal(tile).await,
                    Err(_) => {
                        println!("❓ Enter a tile number or 'c'");
                        continue;
                    }
                },
            };

            match next {
                Ok(next) => board = next,
                Err(e) if e.requires_login() || !field.in_round() => return Err(e),
                Err(e) => println!("⚠️  {}", e.user_message()),
            }
        }
    }

    fn show_board(board: &MinesweeperBoard) {
        let mines = board
            .status
            .reveal()
            .map(|r| r.mine_positions.clone())
            .unwrap_or_default();
        let size = usize::from(board.grid_size);

        for row in 0..size {
            let line: Vec<String> = (0..size)
                .map(|col| {
                    let index = row * size + col;
                    if mines.contains(&index) {
                        " 💣".to_string()
                    } else if board.revealed.contains(&index) {
                        " 💎".to_string()
                    } else {
                        format!("{:>3}", index)
                    }
                })
                .collect();
            println!("{}", line.join(" "));
        }
        if !board.message.is_empty() {
            println!("{}", board.message);
        }
    }

    pub async fn coin_request_command(app: &WagerlineApp, amount: i64, reason: &str) -> Result<()> {
        app.coins.sync().await?;
        let request = app.coins.submit(amount, reason).await?;
        println!("📨 Request #{} for {} coins sent for review", request.id, request.amount);
        Ok(())
    }

    pub async fn coin_list_command(app: &WagerlineApp) -> Result<()> {
        let approved = app.coins.sync().await?;
        let requests = app.coins.my_requests().unwrap_or_default();
        if requests.is_empty() {
            println!("📭 No coin requests yet");
        } else {
            println!("📨 Your coin requests:");
            for request in &requests {
                print_coin_request(request);
            }
        }

        if !approved.is_empty() {
            let profile = app.account.refresh().await?;
            println!("💰 Balance: {} coins", profile.coins);
        }
        Ok(())
    }

    pub async fn coin_recover_command(app: &WagerlineApp) -> Result<()> {
        app.coins.sync().await?;
        let request = app.coins.request_recovery().await?;
        println!("🆘 Recovery request #{} sent. Staff will review it soon.", request.id);
        Ok(())
    }

    pub async fn admin_pending_command(app: &WagerlineApp) -> Result<()> {
        let pending = app.coins.load_pending().await?;
        if pending.is_empty() {
            println!("✅ Nothing waiting for review");
            return Ok(());
        }

        println!("🛡️  Pending coin requests:");
        for request in &pending {
            println!("  by {} <{}>", request.user.username, request.user.email);
            print_coin_request(request);
        }
        Ok(())
    }

    pub async fn admin_approve_command(app: &WagerlineApp, id: u64) -> Result<()> {
        let request = app.coins.approve(id).await?;
        println!("✅ Approved #{}: {} coins for {}", request.id, request.amount, request.user.username);
        Ok(())
    }

    pub async fn admin_deny_command(app: &WagerlineApp, id: u64) -> Result<()> {
        let request = app.coins.deny(id).await?;
        println!("🚫 Denied #{} from {}", request.id, request.user.username);
        Ok(())
    }
}
