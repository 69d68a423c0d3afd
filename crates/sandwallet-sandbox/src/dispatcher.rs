//! Per-session dispatcher: the only code that touches the chain SDK.
//!
//! Every action the host sends is replayed into a mirror of the host state
//! tree. Request actions additionally run their handler in a task of their
//! own. A request whose slice is already loading in the mirror is dropped,
//! so at most one request per slice is ever in flight. Handlers never
//! propagate failures to the caller: an error is logged, relayed to the host
//! console and turned into the `_ERROR` action of the request.

use crate::error::{Result, SandboxError, SdkError};
use crate::keys;
use crate::outbox::Outbox;
use crate::sdk::{ChainConnection, ChainSdk};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sandwallet_constants::{AIRDROP_LAMPORTS, MAX_MINT_AMOUNT, MINT_DECIMALS};
use sandwallet_core::{reduce, reduce_with_epoch};
use sandwallet_types::{
    AccountRequest, Action, ActionKind, Cluster, ConnectRequest, ConsoleMessage, State, Token,
};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Tunables for one sandbox session.
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Lamports requested when a fresh keypair is generated
    pub airdrop_lamports: u64,
    /// Fixed seed for the minted amounts; entropy when absent
    pub rng_seed: Option<u64>,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            airdrop_lamports: AIRDROP_LAMPORTS,
            rng_seed: None,
        }
    }
}

/// Handles held for the lifetime of a session. Never serialized.
#[derive(Default)]
struct Session {
    connection: Option<Arc<dyn ChainConnection>>,
    keypair: Option<Arc<Keypair>>,
}

pub struct SandboxDispatcher {
    session_id: String,
    sdk: Arc<dyn ChainSdk>,
    session: Mutex<Session>,
    mirror: Mutex<State>,
    outbox: Outbox,
    rng: Mutex<StdRng>,
    airdrop_lamports: u64,
}

impl SandboxDispatcher {
    pub fn new(sdk: Arc<dyn ChainSdk>, outbox: Outbox, options: &SandboxOptions) -> Arc<Self> {
        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Arc::new(Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            sdk,
            session: Mutex::new(Session::default()),
            mirror: Mutex::new(State::default()),
            outbox,
            rng: Mutex::new(rng),
            airdrop_lamports: options.airdrop_lamports,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Snapshot of the mirrored state tree.
    pub async fn mirror(&self) -> State {
        self.mirror.lock().await.clone()
    }

    /// Mirror `action` and, for a request whose slice is free, start its
    /// handler. `seq` is the host sequence number of the statement and
    /// becomes the epoch of the result.
    ///
    /// Returns the handler task, or `None` when nothing was started.
    pub async fn dispatch(self: &Arc<Self>, action: Action, seq: Option<u64>) -> Option<JoinHandle<()>> {
        let Some(kind) = action.kind().filter(|_| action.is_request()) else {
            let mut mirror = self.mirror.lock().await;
            *mirror = reduce(&mirror, &action);
            return None;
        };

        {
            let mut mirror = self.mirror.lock().await;
            if mirror.is_loading(kind.slice()) {
                debug!(session_id = %self.session_id, action = %kind, ?seq, "Slice busy, request dropped");
                return None;
            }
            *mirror = reduce_with_epoch(&mirror, &action, seq);
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.run(kind, action, seq).await }))
    }

    async fn run(&self, kind: ActionKind, action: Action, epoch: Option<u64>) {
        let label = match epoch {
            Some(epoch) => format!("{} #{epoch}", kind.as_str()),
            None => kind.as_str().to_string(),
        };
        self.outbox.console(ConsoleMessage::group(label.clone()));
        let result = match action {
            Action::Connect(request) => self.connect(request).await,
            Action::AccountGet(request) => self.account_get(request).await,
            Action::TokenList => self.token_list().await,
            Action::TokenAdd => self.token_add().await,
            _ => return,
        };
        let outcome = result.unwrap_or_else(|err| {
            error!(session_id = %self.session_id, action = %kind, error = %err, "Handler failed");
            self.outbox.error(err.to_string());
            Action::failure(kind, err.to_payload())
        });
        self.emit(outcome, epoch).await;
        self.outbox.console(ConsoleMessage::group_end(label));
    }

    /// Fold a result into the mirror, then post it.
    async fn emit(&self, action: Action, epoch: Option<u64>) {
        {
            let mut mirror = self.mirror.lock().await;
            *mirror = reduce_with_epoch(&mirror, &action, epoch);
        }
        self.outbox.post_action(action, epoch);
    }

    async fn connection(&self) -> Result<Arc<dyn ChainConnection>> {
        self.session
            .lock()
            .await
            .connection
            .clone()
            .ok_or_else(SandboxError::not_connected)
    }

    async fn keypair(&self) -> Result<Arc<Keypair>> {
        self.session
            .lock()
            .await
            .keypair
            .clone()
            .ok_or_else(SandboxError::not_authenticated)
    }

    #[instrument(skip_all, fields(session_id = %self.session_id, cluster = %request.cluster))]
    async fn connect(&self, request: ConnectRequest) -> Result<Action> {
        let cluster = Cluster::from_str(&request.cluster)
            .map_err(|e| SdkError::invalid_cluster(e.0))?;
        let connection = self.sdk.connect(&cluster).await?;
        self.session.lock().await.connection = Some(connection);
        info!("Connection established");
        self.outbox.log(format!("Connected to {cluster}"));
        Ok(Action::ConnectSuccess)
    }

    #[instrument(skip_all, fields(session_id = %self.session_id, restore = request.secret_key.is_some()))]
    async fn account_get(&self, request: AccountRequest) -> Result<Action> {
        let connection = self.connection().await?;
        let keypair = match request.secret_key {
            Some(secret_key) => {
                let keypair = keys::reconstruct(&secret_key, request.public_key.as_deref())?;
                info!(public_key = %keypair.pubkey(), "Keypair restored");
                keypair
            }
            None => {
                let keypair = keys::generate();
                let signature = connection
                    .request_airdrop(&keypair.pubkey(), self.airdrop_lamports)
                    .await?;
                connection.confirm(&signature).await?;
                info!(public_key = %keypair.pubkey(), lamports = self.airdrop_lamports, "New keypair funded");
                self.outbox.log(format!("Airdropped {} lamports", self.airdrop_lamports));
                keypair
            }
        };
        let account = keys::account_of(&keypair);
        self.session.lock().await.keypair = Some(Arc::new(keypair));
        Ok(Action::AccountGetSuccess(account))
    }

    #[instrument(skip_all, fields(session_id = %self.session_id))]
    async fn token_add(&self) -> Result<Action> {
        let connection = self.connection().await?;
        let keypair = self.keypair().await?;
        let owner = keypair.pubkey();

        let mint_keypair = Keypair::new();
        let mint = connection
            .create_mint(&keypair, &mint_keypair, &owner, Some(&owner), MINT_DECIMALS)
            .await?;
        let ata = connection
            .get_or_create_associated_token_account(&keypair, &mint, &owner)
            .await?;
        let amount = self.rng.lock().await.gen_range(0..MAX_MINT_AMOUNT);
        connection.mint_to(&keypair, &mint, &ata, amount).await?;
        info!(%mint, %ata, amount, "Token minted");
        self.outbox.log(format!("Minted {amount} of {mint}"));

        let token = fetch_token(connection.as_ref(), &ata).await?;
        Ok(Action::TokenAddSuccess(token))
    }

    #[instrument(skip_all, fields(session_id = %self.session_id))]
    async fn token_list(&self) -> Result<Action> {
        let connection = self.connection().await?;
        let keypair = self.keypair().await?;
        let addresses = connection.token_accounts_by_owner(&keypair.pubkey()).await?;
        let mut tokens = Vec::with_capacity(addresses.len());
        for address in &addresses {
            tokens.push(fetch_token(connection.as_ref(), address).await?);
        }
        info!(count = tokens.len(), "Token accounts listed");
        Ok(Action::TokenListSuccess(tokens))
    }
}

/// Canonical mint and token account records for one token account.
async fn fetch_token(connection: &dyn ChainConnection, address: &Pubkey) -> Result<Token> {
    let account = connection.get_token_account(address).await?;
    let mint = Pubkey::from_str(&account.mint)
        .map_err(|e| SdkError::invalid_account_data(account.mint.clone(), e.to_string()))?;
    let mint = connection.get_mint(&mint).await?;
    Ok(Token { mint, account })
}
