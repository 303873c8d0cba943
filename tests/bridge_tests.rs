use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mirror_status::bridge::BridgeError;
use mirror_status::bridge::engine::{
    EngineError, EngineListener, EngineNode, EngineRequest, EngineTransfer, RequestKind, TransferEngine,
    TransferState,
};
use mirror_status::bridge::executor::AsyncExecutor;
use mirror_status::bridge::listener::{AppListener, TransferObserver};
use mirror_status::bridge::session::{engine_login, engine_logout};
use mirror_status::bridge::status::EngineTransferStatus;
use mirror_status::bridge::wait::WaitHandle;
use mirror_status::task::{MirrorStatus, Task, TaskListener};

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Complete,
    Error(String),
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl TransferObserver for ChannelObserver {
    async fn on_download_complete(&self) {
        let _ = self.tx.send(Event::Complete);
    }

    async fn on_download_error(&self, message: String) {
        let _ = self.tx.send(Event::Error(message));
    }
}

/// 只记录调用，不主动回调
#[derive(Default)]
struct RecordingEngine {
    root: Option<EngineNode>,
    fetch_calls: AtomicUsize,
    cancelled: Mutex<Vec<String>>,
}

impl TransferEngine for RecordingEngine {
    fn login(&self, _email: &str, _password: &str) {}

    fn logout(&self) {}

    fn fetch_nodes(&self) {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn root_node(&self) -> Option<EngineNode> {
        self.root.clone()
    }

    fn cancel_transfer(&self, transfer: &EngineTransfer) {
        self.cancelled.lock().unwrap().push(transfer.file_name.clone());
    }
}

/// 在另一个线程上完成登录流程的引擎
struct ThreadedEngine {
    listener: Mutex<Option<Arc<AppListener>>>,
    root: Option<EngineNode>,
    login_error: Option<EngineError>,
}

impl ThreadedEngine {
    fn new(root: Option<EngineNode>, login_error: Option<EngineError>) -> Arc<Self> {
        Arc::new(Self {
            listener: Mutex::new(None),
            root,
            login_error,
        })
    }

    fn listener(&self) -> Arc<AppListener> {
        self.listener.lock().unwrap().clone().unwrap()
    }
}

struct ThreadedApi(Arc<ThreadedEngine>);

impl TransferEngine for ThreadedApi {
    fn login(&self, _email: &str, _password: &str) {
        let engine = self.0.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let err = engine.login_error.clone().unwrap_or_else(EngineError::ok);
            let api = ThreadedApi(engine.clone());
            engine
                .listener()
                .on_request_finish(&api, &EngineRequest::new(RequestKind::Login), &err);
        });
    }

    fn logout(&self) {
        let engine = self.0.clone();
        thread::spawn(move || {
            let api = ThreadedApi(engine.clone());
            engine
                .listener()
                .on_request_finish(&api, &EngineRequest::new(RequestKind::Logout), &EngineError::ok());
        });
    }

    fn fetch_nodes(&self) {
        let engine = self.0.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let api = ThreadedApi(engine.clone());
            engine
                .listener()
                .on_request_finish(&api, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
        });
    }

    fn root_node(&self) -> Option<EngineNode> {
        self.0.root.clone()
    }

    fn cancel_transfer(&self, _transfer: &EngineTransfer) {}
}

fn node(name: &str, is_folder: bool) -> EngineNode {
    EngineNode {
        handle: 7,
        name: name.to_string(),
        size: 4096,
        is_folder,
    }
}

fn transfer(file_name: &str, state: TransferState) -> EngineTransfer {
    EngineTransfer {
        tag: 1,
        file_name: file_name.to_string(),
        speed: 512,
        transferred_bytes: 1024,
        total_bytes: 4096,
        state,
        finished: false,
        folder_transfer: false,
    }
}

fn setup() -> (Arc<WaitHandle>, Arc<AppListener>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let event = Arc::new(WaitHandle::new());
    let listener = Arc::new(AppListener::new(event.clone(), Arc::new(ChannelObserver { tx })));
    (event, listener, rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("等待通知超时")
        .expect("通道已关闭")
}

#[test]
fn test_wait_handle() {
    let handle = Arc::new(WaitHandle::new());
    assert!(!handle.is_set());
    assert!(!handle.wait_timeout(Duration::from_millis(10)));

    let setter = handle.clone();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        setter.set();
    });
    handle.wait();
    assert!(handle.is_set());
    worker.join().unwrap();

    // 重复设置无副作用
    handle.set();
    handle.wait();
    handle.clear();
    assert!(!handle.is_set());
}

#[test]
fn test_perform_blocks_until_signal() {
    let executor = Arc::new(AsyncExecutor::new());
    let event = executor.continue_event();
    // 上一轮遗留的信号会被清除
    event.set();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    executor
        .perform(move || {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                counter.fetch_add(1, Ordering::SeqCst);
                event.set();
            });
        })
        .unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_perform_is_rejected() {
    let executor = Arc::new(AsyncExecutor::new());
    let pending = tokio::spawn({
        let executor = executor.clone();
        async move { executor.perform_async(|| {}).await }
    });

    // 等第一个请求进入等待
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(executor.is_busy());
    assert_eq!(executor.perform(|| {}), Err(BridgeError::ExecutorBusy));

    executor.continue_event().set();
    pending.await.unwrap().unwrap();
    assert!(!executor.is_busy());
}

#[tokio::test]
async fn test_login_waits_for_fetch_nodes() {
    let (event, listener, _rx) = setup();
    let api = RecordingEngine {
        root: Some(node("Cloud Drive", true)),
        ..Default::default()
    };

    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::Login), &EngineError::ok());
    assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 1);
    assert!(!event.is_set());

    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
    assert!(event.is_set());
    assert_eq!(listener.name(), "Cloud Drive");
    assert_eq!(listener.node(), Some(node("Cloud Drive", true)));
    assert!(listener.error().is_none());
}

#[tokio::test]
async fn test_login_signals_when_node_already_resolved() {
    let (event, listener, _rx) = setup();
    let api = RecordingEngine {
        root: Some(node("shared", true)),
        ..Default::default()
    };
    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
    event.clear();

    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::Login), &EngineError::ok());
    assert!(event.is_set());
}

#[tokio::test]
async fn test_fetch_nodes_without_root() {
    let (event, listener, _rx) = setup();
    let api = RecordingEngine::default();

    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
    assert!(event.is_set());
    assert_eq!(listener.error().as_deref(), Some("Root node not found"));
}

#[tokio::test]
async fn test_public_node_and_request_error() {
    let (event, listener, _rx) = setup();
    let api = RecordingEngine::default();

    listener.on_request_finish(
        &api,
        &EngineRequest::public_node(node("movie.mkv", false)),
        &EngineError::ok(),
    );
    assert!(event.is_set());
    assert_eq!(listener.name(), "movie.mkv");
    assert_eq!(listener.public_node(), Some(node("movie.mkv", false)));

    event.clear();
    let not_found = EngineError::new(EngineError::NOT_FOUND, "Not found");
    assert!(not_found.is_not_found());
    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::Logout), &not_found);
    assert!(event.is_set());
    assert_eq!(listener.error().as_deref(), Some("Not found"));
}

#[tokio::test]
async fn test_request_temporary_error_notifies_once() {
    let (event, listener, mut rx) = setup();
    let api = RecordingEngine::default();
    let request = EngineRequest::new(RequestKind::FetchNodes);

    listener.on_request_temporary_error(&api, &request, &EngineError::new(-3, "Try again"));
    listener.on_request_temporary_error(&api, &request, &EngineError::new(-4, "Rate limit"));

    assert!(event.is_set());
    assert!(listener.is_cancelled());
    assert_eq!(listener.error().as_deref(), Some("Rate limit"));
    assert_eq!(recv(&mut rx).await, Event::Error("RequestTempError: Try again".to_string()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_transfer_update_and_finish() {
    let (event, listener, mut rx) = setup();
    let api = RecordingEngine {
        root: Some(node("movie.mkv", false)),
        ..Default::default()
    };
    listener.on_request_finish(&api, &EngineRequest::new(RequestKind::FetchNodes), &EngineError::ok());
    event.clear();

    listener.on_transfer_update(&api, &transfer("movie.mkv", TransferState::Active));
    assert_eq!(listener.speed(), 512);
    assert_eq!(listener.downloaded_bytes(), 1024);
    assert!(!event.is_set());

    // 名称不匹配的文件完成时不算整体完成
    let mut other = transfer("other.mkv", TransferState::Completed);
    other.finished = true;
    listener.on_transfer_finish(&api, &other, &EngineError::ok());
    assert!(!event.is_set());

    let mut done = transfer("movie.mkv", TransferState::Completed);
    done.finished = true;
    done.transferred_bytes = 4096;
    listener.on_transfer_finish(&api, &done, &EngineError::ok());
    assert!(event.is_set());
    assert_eq!(listener.downloaded_bytes(), 4096);
    assert_eq!(recv(&mut rx).await, Event::Complete);
}

#[tokio::test]
async fn test_folder_transfer_finish_ignores_name() {
    let (event, listener, mut rx) = setup();
    let api = RecordingEngine::default();

    let mut done = transfer("some-folder", TransferState::Completed);
    done.finished = true;
    done.folder_transfer = true;
    listener.on_transfer_finish(&api, &done, &EngineError::ok());
    assert!(event.is_set());
    assert_eq!(recv(&mut rx).await, Event::Complete);
}

#[tokio::test]
async fn test_cancel_stops_transfer() {
    let (event, listener, mut rx) = setup();
    let api = RecordingEngine::default();

    listener.cancel_task().await;
    assert!(listener.is_cancelled());
    assert!(!event.is_set());
    assert_eq!(recv(&mut rx).await, Event::Error("Download Canceled by user".to_string()));

    listener.on_transfer_update(&api, &transfer("movie.mkv", TransferState::Active));
    assert!(event.is_set());
    assert_eq!(*api.cancelled.lock().unwrap(), vec!["movie.mkv".to_string()]);
    assert_eq!(listener.downloaded_bytes(), 0);

    event.clear();
    let mut done = transfer("movie.mkv", TransferState::Cancelled);
    done.finished = true;
    listener.on_transfer_finish(&api, &done, &EngineError::ok());
    assert!(event.is_set());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_transfer_temporary_error() {
    let (event, listener, _rx) = setup();
    let api = RecordingEngine::default();
    let err = EngineError::new(-17, "Over quota");

    listener.on_transfer_temporary_error(&api, &transfer("a.bin", TransferState::Retrying), &err);
    listener.on_transfer_temporary_error(&api, &transfer("a.bin", TransferState::Queued), &err);
    assert!(!event.is_set());
    assert!(listener.error().is_none());

    listener.on_transfer_temporary_error(&api, &transfer("a.bin", TransferState::Failed), &err);
    assert!(event.is_set());
    assert!(listener.is_cancelled());
    assert_eq!(listener.error().as_deref(), Some("TransferTempError: Over quota (a.bin)"));

    // 已取消后不再发信号，但错误信息会更新
    event.clear();
    listener.on_transfer_temporary_error(&api, &transfer("b.bin", TransferState::Failed), &err);
    assert!(!event.is_set());
    assert_eq!(listener.error().as_deref(), Some("TransferTempError: Over quota (b.bin)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_login_and_logout() {
    let executor = Arc::new(AsyncExecutor::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let listener = Arc::new(AppListener::new(
        executor.continue_event(),
        Arc::new(ChannelObserver { tx }),
    ));
    let engine = ThreadedEngine::new(Some(node("Cloud Drive", true)), None);
    *engine.listener.lock().unwrap() = Some(listener.clone());
    let api: Arc<dyn TransferEngine> = Arc::new(ThreadedApi(engine.clone()));

    engine_login(&executor, api.clone(), &listener, Some("a@b.c"), Some("pw"))
        .await
        .unwrap();
    assert_eq!(listener.name(), "Cloud Drive");

    let folder_api: Arc<dyn TransferEngine> = Arc::new(ThreadedApi(engine));
    engine_logout(&executor, api, Some(folder_api)).await.unwrap();
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_login_reports_error() {
    let executor = Arc::new(AsyncExecutor::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let listener = Arc::new(AppListener::new(
        executor.continue_event(),
        Arc::new(ChannelObserver { tx }),
    ));
    let engine = ThreadedEngine::new(None, Some(EngineError::new(-11, "Access denied")));
    *engine.listener.lock().unwrap() = Some(listener.clone());
    let api: Arc<dyn TransferEngine> = Arc::new(ThreadedApi(engine));

    let result = engine_login(&executor, api, &listener, Some("a@b.c"), Some("wrong")).await;
    assert_eq!(result, Err(BridgeError::Engine("Access denied".to_string())));
}

#[tokio::test]
async fn test_engine_login_skipped_without_credentials() {
    let executor = Arc::new(AsyncExecutor::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let listener = AppListener::new(executor.continue_event(), Arc::new(ChannelObserver { tx }));
    let api: Arc<dyn TransferEngine> = Arc::new(RecordingEngine::default());

    // 没有任何回调，若真的发起请求会一直阻塞
    engine_login(&executor, api.clone(), &listener, None, Some("pw")).await.unwrap();
    engine_login(&executor, api, &listener, Some("a@b.c"), None).await.unwrap();
    assert!(!executor.is_busy());
}

#[tokio::test]
async fn test_engine_transfer_status() {
    let (_event, listener, mut rx) = setup();
    let api = RecordingEngine::default();
    let status = EngineTransferStatus::new("0123456789abcdef", "movie.mkv", 4096, listener.clone(), TaskListener::new(3));

    assert_eq!(status.status().await, MirrorStatus::Download);
    assert_eq!(status.progress().await, "0.00%");
    assert_eq!(status.eta(), "-");

    listener.on_transfer_update(&api, &transfer("movie.mkv", TransferState::Active));
    assert_eq!(status.processed_bytes(), "1.00KB");
    assert_eq!(status.size(), "4.00KB");
    assert_eq!(status.speed(), "512.00B/s");
    assert_eq!(status.progress().await, "25.00%");
    assert_eq!(status.eta(), "6s");
    assert_eq!(status.short_id(), "01234567");

    status.cancel().await;
    assert!(listener.is_cancelled());
    assert_eq!(recv(&mut rx).await, Event::Error("Download Canceled by user".to_string()));
}
